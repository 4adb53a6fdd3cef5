//! Persistence boundary for books.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{Book, BookId, NewBook};

#[cfg(test)]
pub(crate) mod memory;
mod postgres;

pub use postgres::PgBookStore;

/// Name of the partial unique index guarding ISBNs of live rows.
pub const ISBN_UNIQUE_CONSTRAINT: &str = "books_isbn_active_unique";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("book not found")]
    NotFound,
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl StoreError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Queries the book service needs. Finders report absence as `Ok(None)`;
/// mutations report it as `StoreError::NotFound`. Soft-deleted rows are
/// invisible to every method.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn find_all(&self) -> Result<Vec<Book>, StoreError>;

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, StoreError>;

    /// Live book holding `isbn`, ignoring `exclude_id` when given.
    async fn find_by_isbn(
        &self,
        isbn: &str,
        exclude_id: Option<BookId>,
    ) -> Result<Option<Book>, StoreError>;

    async fn insert(&self, book: &NewBook) -> Result<Book, StoreError>;

    /// Persist every mutable column of `book`; returns the stored row with
    /// its refreshed `updated_at`.
    async fn update(&self, book: &Book) -> Result<Book, StoreError>;

    async fn soft_delete(&self, id: BookId) -> Result<(), StoreError>;
}
