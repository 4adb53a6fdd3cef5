//! Bookshelf application library: the books module and process bootstrap.

pub mod bootstrap;
pub mod modules;
pub mod utils;

pub use bootstrap::{migrate, serve};
