//! Cache backend implementations.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

pub mod inmemory;
pub mod redis;

pub use inmemory::InMemoryBackend;
pub use redis::RedisBackend;

/// Byte-level storage contract behind [`crate::Cache`].
///
/// All methods take `&self`; implementations are shared across request
/// tasks and must handle concurrent callers.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name used in log fields.
    fn name(&self) -> &'static str;

    /// `Ok(None)` on a miss, including an expired entry.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Remove the given keys. Absent keys are not an error.
    async fn delete(&self, keys: &[&str]) -> Result<()>;

    /// Remove every key matching a glob pattern and return how many were
    /// removed. Cost is proportional to the whole key space.
    async fn delete_pattern(&self, pattern: &str) -> Result<usize>;

    /// Verify the backend is reachable.
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
