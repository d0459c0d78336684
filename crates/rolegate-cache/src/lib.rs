//! Cache gateways for role permissions.
//!
//! ## Cache Modes
//!
//! - **Local**: [`LocalCacheGateway`], an in-process map with per-entry TTL.
//!   Single-instance deployments and tests.
//! - **Redis**: [`RedisCacheGateway`], shared across instances. Values are the
//!   JSON form of a `PermissionMap` under `role::<name>` keys.
//!
//! ## Graceful Degradation
//!
//! [`create_cache_gateway`] falls back to the local gateway when Redis is
//! disabled or cannot be reached at startup, so the service still starts.

pub mod config;
pub mod local;
pub mod redis_backend;

use std::sync::Arc;
use std::time::Duration;

use rolegate_core::CacheGateway;

pub use config::RedisConfig;
pub use local::{CacheStats, LocalCacheGateway, spawn_cleanup_task};
pub use redis_backend::RedisCacheGateway;

/// The cache tier selected at startup.
#[derive(Clone)]
pub enum CacheBackend {
    /// Single-instance: in-process map only
    Local(Arc<LocalCacheGateway>),

    /// Multi-instance: shared Redis
    Redis(Arc<RedisCacheGateway>),
}

impl CacheBackend {
    /// The gateway to hand to the resolver.
    pub fn gateway(&self) -> Arc<dyn CacheGateway> {
        match self {
            CacheBackend::Local(local) => local.clone(),
            CacheBackend::Redis(redis) => redis.clone(),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            CacheBackend::Local(_) => "local",
            CacheBackend::Redis(_) => "redis",
        }
    }

    /// Check if Redis is reachable (for health checks).
    pub async fn is_redis_available(&self) -> bool {
        match self {
            CacheBackend::Local(_) => false,
            CacheBackend::Redis(redis) => redis.is_available().await,
        }
    }
}

/// Create a cache backend based on configuration.
///
/// - **Redis disabled**: local gateway
/// - **Redis enabled**: connects to Redis, falls back to local on failure
pub async fn create_cache_gateway(config: &RedisConfig) -> CacheBackend {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return CacheBackend::Local(Arc::new(LocalCacheGateway::new()));
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let timeout = Duration::from_millis(config.timeout_ms);
    if let Some(ref mut pool_config) = redis_config.pool {
        pool_config.max_size = config.pool_size;
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);
    } else {
        let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(timeout);
        pool_config.timeouts.create = Some(timeout);
        pool_config.timeouts.recycle = Some(timeout);
        redis_config.pool = Some(pool_config);
    }

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return CacheBackend::Local(Arc::new(LocalCacheGateway::new()));
        }
    };

    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            CacheBackend::Redis(Arc::new(RedisCacheGateway::new(pool)))
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local cache."
            );
            CacheBackend::Local(Arc::new(LocalCacheGateway::new()))
        }
    }
}
