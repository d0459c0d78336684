//! Redis-backed cache gateway.
//!
//! ## Commands
//!
//! | Operation            | Redis                                   |
//! |----------------------|-----------------------------------------|
//! | `batch_get`          | `MGET k1 k2 …`                          |
//! | `renew_ttl`          | `PEXPIRE k ttl_ms`                      |
//! | `batch_set_with_ttl` | `MULTI; SET k v PX ttl_ms; …; EXEC`     |
//!
//! Values are JSON-encoded `PermissionMap`s. A value that no longer decodes
//! (written by an incompatible version, or corrupted) reads as a miss and is
//! overwritten on the next population.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use rolegate_core::{CacheError, CacheGateway, CacheResult, PermissionMap};

/// Cache gateway over a deadpool Redis pool.
#[derive(Clone)]
pub struct RedisCacheGateway {
    pool: Pool,
}

impl RedisCacheGateway {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> CacheResult<Connection> {
        self.pool.get().await.map_err(CacheError::backend)
    }

    /// Remove a key. Returns `true` if it existed.
    pub async fn invalidate(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection().await?;
        let removed: u64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(CacheError::backend)?;
        tracing::debug!(key = %key, removed, "cache invalidated");
        Ok(removed > 0)
    }

    /// Check if a pooled connection can be obtained (for health checks).
    pub async fn is_available(&self) -> bool {
        self.pool.get().await.is_ok()
    }
}

#[async_trait]
impl CacheGateway for RedisCacheGateway {
    async fn batch_get(&self, keys: &[String]) -> CacheResult<Vec<Option<PermissionMap>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.connection().await?;
        let raw: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(CacheError::backend)?;

        if raw.len() != keys.len() {
            return Err(CacheError::backend(format!(
                "MGET returned {} values for {} keys",
                raw.len(),
                keys.len()
            )));
        }

        Ok(keys
            .iter()
            .zip(raw)
            .map(|(key, value)| value.and_then(|bytes| decode_value(key, &bytes)))
            .collect())
    }

    async fn renew_ttl(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let mut conn = self.connection().await?;
        let renewed: bool = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(CacheError::backend)?;
        Ok(renewed)
    }

    async fn batch_set_with_ttl(
        &self,
        entries: &[(String, PermissionMap)],
        ttl: Duration,
    ) -> CacheResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let ttl_ms = ttl_millis(ttl);
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, permissions) in entries {
            let value = serde_json::to_vec(permissions)?;
            pipe.cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(ttl_ms)
                .ignore();
        }

        let mut conn = self.connection().await?;
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(CacheError::backend)?;
        tracing::debug!(count = entries.len(), ttl_ms, "cache set (atomic batch)");
        Ok(())
    }
}

/// Millisecond TTL, never below 1 ms (`PX 0` is rejected by Redis).
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn decode_value(key: &str, bytes: &[u8]) -> Option<PermissionMap> {
    match serde_json::from_slice(bytes) {
        Ok(permissions) => Some(permissions),
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "undecodable cache value, treating as miss");
            None
        }
    }
}
