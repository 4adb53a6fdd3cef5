//! In-process cache backend.
//!
//! Uses DashMap for concurrent access with per-key sharding. Expiry is
//! checked on access; expired entries are dropped lazily.

use async_trait::async_trait;
use dashmap::DashMap;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::CacheBackend;
use crate::error::{CacheError, Result};

struct CacheEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Thread-safe in-memory backend, cheap to clone.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    store: Arc<DashMap<String, CacheEntry>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until next access.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Overwrite the raw bytes under `key`, bypassing serialization.
    pub fn insert_raw(&self, key: &str, data: Vec<u8>, ttl: Duration) {
        self.store.insert(
            key.to_string(),
            CacheEntry {
                data,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.store.get(key) {
            if !entry.is_expired() {
                tracing::debug!(key, "memory cache hit");
                return Ok(Some(entry.data.clone()));
            }
        }

        self.store.remove_if(key, |_, entry| entry.is_expired());
        tracing::debug!(key, "memory cache miss");
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.insert_raw(key, value, ttl);
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.store.remove(*key);
        }
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize> {
        let matcher = glob_to_regex(pattern)?;

        // Collect first: removing while iterating a DashMap shard deadlocks.
        let matching: Vec<String> = self
            .store
            .iter()
            .filter(|entry| matcher.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        let removed = matching
            .iter()
            .filter(|key| self.store.remove(key.as_str()).is_some())
            .count();

        tracing::debug!(pattern, removed, "memory cache pattern delete");
        Ok(removed)
    }
}

/// Translate a Redis-style glob (`*`, `?`) into an anchored regex.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push_str("^(?s)");

    let mut buf = [0u8; 4];
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    expr.push('$');

    Regex::new(&expr).map_err(CacheError::backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn get_returns_stored_bytes() {
        let backend = InMemoryBackend::new();
        backend.set("book:1", b"payload".to_vec(), TTL).await.unwrap();

        assert_eq!(
            backend.get("book:1").await.unwrap(),
            Some(b"payload".to_vec())
        );
        assert_eq!(backend.get("book:2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_misses_and_evicted() {
        let backend = InMemoryBackend::new();
        backend
            .set("book:1", b"payload".to_vec(), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(backend.get("book:1").await.unwrap(), None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let backend = InMemoryBackend::new();
        backend.set("books:all", vec![1], TTL).await.unwrap();

        backend.delete(&["books:all", "missing"]).await.unwrap();
        backend.delete(&["books:all"]).await.unwrap();
        backend.delete(&[]).await.unwrap();

        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn delete_pattern_only_removes_matching_keys() {
        let backend = InMemoryBackend::new();
        for key in ["book:1", "book:22", "books:all", "author:1"] {
            backend.set(key, vec![0], TTL).await.unwrap();
        }

        let removed = backend.delete_pattern("book:*").await.unwrap();

        assert_eq!(removed, 2);
        assert!(backend.get("books:all").await.unwrap().is_some());
        assert!(backend.get("author:1").await.unwrap().is_some());
        assert_eq!(backend.delete_pattern("book:*").await.unwrap(), 0);
    }

    #[test]
    fn glob_translation_escapes_literals() {
        let re = glob_to_regex("book.?:[1]*").unwrap();
        assert!(re.is_match("book.x:[1]42"));
        assert!(!re.is_match("bookXx:[1]42"));
        assert!(!re.is_match("prefix-book.x:[1]"));
    }
}
