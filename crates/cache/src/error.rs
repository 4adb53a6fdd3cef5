//! Error types for cache operations.

use thiserror::Error;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Failure modes of the cache layer.
///
/// Callers on the read path treat every variant as a miss; none of them is
/// ever surfaced to an API client.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Key absent or expired.
    #[error("key not found")]
    NotFound,

    /// The value could not be encoded before storing.
    #[error("failed to serialize cache value: {0}")]
    Serialization(String),

    /// The stored payload does not decode into the requested type.
    #[error("failed to deserialize cache value: {0}")]
    Deserialization(String),

    /// The backend (connection, pool, protocol) failed.
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    /// True for an ordinary miss, false for anything that deserves a log line.
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotFound)
    }
}
