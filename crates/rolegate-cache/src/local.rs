//! In-process cache gateway with per-entry TTL.
//!
//! Used when Redis is disabled or unreachable, and as a real (non-mock)
//! gateway in tests. Entries live behind a single `RwLock` so a batch write
//! lands as one unit: concurrent readers see all of it or none of it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use rolegate_core::{CacheGateway, CacheResult, PermissionMap};
use tokio::task::JoinHandle;

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of entries currently held (including not yet evicted expired ones).
    pub size: usize,
    /// Number of keys found on read.
    pub hits: u64,
    /// Number of keys not found on read.
    pub misses: u64,
    /// Number of entries removed because their TTL ran out.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Cached permissions with expiration time.
struct LocalEntry {
    permissions: PermissionMap,
    expires_at: Instant,
}

/// Local in-memory cache gateway.
///
/// Thread-safe; share it as `Arc<LocalCacheGateway>`.
#[derive(Default)]
pub struct LocalCacheGateway {
    entries: RwLock<HashMap<String, LocalEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LocalCacheGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a key. Returns `true` if it existed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Clear all cached entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.read().len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Clean up expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.entries.write().retain(|_, entry| {
            if entry.expires_at <= now {
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        }

        removed
    }
}

#[async_trait]
impl CacheGateway for LocalCacheGateway {
    async fn batch_get(&self, keys: &[String]) -> CacheResult<Vec<Option<PermissionMap>>> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let mut hits: u64 = 0;
        let mut evicted: u64 = 0;

        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let value = match entries.get(key) {
                Some(entry) if entry.expires_at > now => Some(entry.permissions.clone()),
                Some(_) => {
                    entries.remove(key);
                    evicted += 1;
                    None
                }
                None => None,
            };
            if value.is_some() {
                hits += 1;
            }
            values.push(value);
        }
        drop(entries);

        self.hits.fetch_add(hits, Ordering::Relaxed);
        self.misses
            .fetch_add(keys.len() as u64 - hits, Ordering::Relaxed);
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
        Ok(values)
    }

    async fn renew_ttl(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + ttl;
                Ok(true)
            }
            Some(_) => {
                entries.remove(key);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn batch_set_with_ttl(
        &self,
        entries: &[(String, PermissionMap)],
        ttl: Duration,
    ) -> CacheResult<()> {
        let expires_at = Instant::now() + ttl;
        let mut stored = self.entries.write();
        for (key, permissions) in entries {
            stored.insert(
                key.clone(),
                LocalEntry {
                    permissions: permissions.clone(),
                    expires_at,
                },
            );
        }
        Ok(())
    }
}

/// Spawn a background task that evicts expired entries every `interval`.
pub fn spawn_cleanup_task(cache: Arc<LocalCacheGateway>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = cache.cleanup_expired();
            if removed > 0 {
                tracing::debug!(removed, "evicted expired cache entries");
            }
        }
    })
}
