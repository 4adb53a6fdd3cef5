//! Redis cache backend over a deadpool connection pool.

use async_trait::async_trait;
use deadpool_redis::{redis::AsyncCommands, Config as PoolConfig, Connection, Pool, Runtime};
use std::time::Duration;

use super::CacheBackend;
use crate::error::{CacheError, Result};

/// Keys requested per `SCAN` round trip during pattern deletes.
const SCAN_BATCH: usize = 200;

/// Redis backend with connection pooling.
#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
}

impl RedisBackend {
    /// Build a pool for `url` and verify the server answers `PING`.
    pub async fn connect(url: &str, pool_size: usize) -> Result<Self> {
        let mut cfg = PoolConfig::from_url(url);
        cfg.pool = Some(deadpool_redis::PoolConfig::new(pool_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Backend(format!("failed to create Redis pool: {e}")))?;

        let backend = Self { pool };
        backend.health_check().await?;

        tracing::info!(pool_size, "redis cache backend initialized");
        Ok(backend)
    }

    async fn conn(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Backend(format!("failed to get Redis connection: {e}")))
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn().await?;

        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| CacheError::Backend(format!("Redis GET failed for key {key}: {e}")))?;

        tracing::debug!(key, hit = value.is_some(), "redis GET");
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.conn().await?;
        let seconds = ttl.as_secs().max(1);

        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(|e| CacheError::Backend(format!("Redis SETEX failed for key {key}: {e}")))?;

        tracing::debug!(key, ttl_secs = seconds, "redis SETEX");
        Ok(())
    }

    async fn delete(&self, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn().await?;
        conn.del::<_, ()>(keys)
            .await
            .map_err(|e| CacheError::Backend(format!("Redis DEL failed: {e}")))?;

        tracing::debug!(count = keys.len(), "redis DEL");
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize> {
        let mut conn = self.conn().await?;
        let mut cursor: u64 = 0;
        let mut removed = 0usize;

        // SCAN instead of KEYS so the server is not blocked for the whole walk.
        loop {
            let (next, keys): (u64, Vec<String>) = deadpool_redis::redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *conn)
                .await
                .map_err(|e| CacheError::Backend(format!("Redis SCAN failed: {e}")))?;

            if !keys.is_empty() {
                let deleted: usize = conn
                    .del(&keys)
                    .await
                    .map_err(|e| CacheError::Backend(format!("Redis DEL failed: {e}")))?;
                removed += deleted;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        tracing::debug!(pattern, removed, "redis pattern delete");
        Ok(removed)
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn().await?;

        let pong: String = deadpool_redis::redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| CacheError::Backend(format!("Redis PING failed: {e}")))?;

        if pong.contains("PONG") {
            Ok(())
        } else {
            Err(CacheError::Backend(format!(
                "unexpected PING reply: {pong}"
            )))
        }
    }
}
