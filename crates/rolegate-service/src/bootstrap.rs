//! Wires a [`PermissionService`] from an [`AppConfig`].

use std::sync::Arc;
use std::time::Duration;

use rolegate_cache::{CacheBackend, create_cache_gateway, spawn_cleanup_task};
use rolegate_core::{CacheGateway, PermissionResolver, PermissionService, RecordStore};
use rolegate_postgres::{PostgresRecordStore, PostgresStoreError};
use tokio::task::JoinHandle;

use crate::claims::JwtClaimsProvider;
use crate::config::AppConfig;

/// Errors that can occur while building the service.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// The configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The record store could not be set up.
    #[error("Record store error: {0}")]
    Store(#[from] PostgresStoreError),
}

impl BootstrapError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// A ready-to-use service plus the handles that keep it running.
pub struct Bootstrapped {
    pub service: PermissionService,
    /// Selected cache tier, for health checks.
    pub cache: CacheBackend,
    /// Local cache eviction task, if one was started.
    pub cleanup_task: Option<JoinHandle<()>>,
}

/// Connect the cache tier and record store described by `config` and build the
/// service on top of them.
///
/// Redis failures degrade to the local cache; store failures are fatal.
///
/// # Errors
///
/// Returns [`BootstrapError`] if the configuration is invalid or the record
/// store cannot be reached.
pub async fn build_service(config: &AppConfig) -> Result<Bootstrapped, BootstrapError> {
    config.validate().map_err(BootstrapError::config)?;

    let claims = JwtClaimsProvider::from_config(&config.auth).map_err(BootstrapError::config)?;
    let cache = create_cache_gateway(&config.redis).await;
    let store = PostgresRecordStore::connect(&config.postgres).await?;

    tracing::info!(
        cache_mode = cache.mode(),
        table = %config.postgres.table,
        record_shape = ?config.postgres.record_shape,
        ttl_secs = config.cache.ttl_secs,
        "Permission service ready"
    );

    let cleanup_task = start_cleanup(&cache, config.cache.cleanup_interval_secs);
    let service = assemble(
        Arc::new(claims),
        cache.gateway(),
        Arc::new(store),
        config,
    );

    Ok(Bootstrapped {
        service,
        cache,
        cleanup_task,
    })
}

/// Build the service from already-constructed collaborators.
pub fn assemble(
    claims: Arc<JwtClaimsProvider>,
    cache: Arc<dyn CacheGateway>,
    store: Arc<dyn RecordStore>,
    config: &AppConfig,
) -> PermissionService {
    let resolver = PermissionResolver::with_config(cache, store, config.resolver_config());
    PermissionService::new(claims, resolver)
}

fn start_cleanup(cache: &CacheBackend, interval_secs: u64) -> Option<JoinHandle<()>> {
    match cache {
        CacheBackend::Local(local) if interval_secs > 0 => Some(spawn_cleanup_task(
            local.clone(),
            Duration::from_secs(interval_secs),
        )),
        _ => None,
    }
}
