//! Typed cache facade for the bookshelf read path.
//!
//! [`Cache`] serializes values to JSON and delegates byte storage to a
//! [`CacheBackend`]. Every entry is written with the same TTL; explicit
//! invalidation after writes is the primary consistency mechanism and the
//! TTL only bounds staleness when an invalidation is missed.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use bookshelf_kernel::settings::{CacheBackendKind, CacheSettings};

pub mod backend;
pub mod error;

pub use backend::{CacheBackend, InMemoryBackend, RedisBackend};
pub use error::{CacheError, Result};

/// Default time-to-live for cached entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Shared handle to a cache backend. Clones share the same backend.
#[derive(Clone)]
pub struct Cache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.backend.name())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Cache {
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        Self::from_backend(Arc::new(backend))
    }

    pub fn from_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Build the configured cache, or `None` when caching is disabled.
    pub async fn from_settings(settings: &CacheSettings) -> Result<Option<Self>> {
        if !settings.enabled {
            return Ok(None);
        }

        let cache = match settings.backend {
            CacheBackendKind::Redis => {
                Self::new(RedisBackend::connect(&settings.url, settings.pool_size).await?)
            }
            CacheBackendKind::Memory => Self::new(InMemoryBackend::new()),
        };

        Ok(Some(cache.with_ttl(Duration::from_secs(settings.ttl_secs))))
    }

    /// Serialize `value` and store it under `key` with the configured TTL.
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let bytes =
            serde_json::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.backend.set(key, bytes, self.ttl).await
    }

    /// Fetch and decode the value under `key`.
    ///
    /// # Errors
    /// `NotFound` when absent or expired, `Deserialization` when the payload
    /// does not decode into `T`, `Backend` on transport failure.
    pub async fn get<T>(&self, key: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let bytes = self.backend.get(key).await?.ok_or(CacheError::NotFound)?;
        serde_json::from_slice(&bytes).map_err(|e| CacheError::Deserialization(e.to_string()))
    }

    /// Remove zero or more keys.
    pub async fn delete(&self, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.backend.delete(keys).await
    }

    /// Remove every key matching a glob pattern. O(keyspace), not O(matches).
    pub async fn delete_pattern(&self, pattern: &str) -> Result<usize> {
        self.backend.delete_pattern(pattern).await
    }

    pub async fn health_check(&self) -> Result<()> {
        self.backend.health_check().await
    }
}
