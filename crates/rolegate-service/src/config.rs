use std::time::Duration;

use rolegate_cache::RedisConfig;
use rolegate_core::{CacheFailurePolicy, ResolverConfig};
use rolegate_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Redis configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Permission cache behaviour
    #[serde(default)]
    pub cache: CacheConfig,
    /// Record store connection and layout
    #[serde(default)]
    pub postgres: PostgresConfig,
    /// Access token verification
    #[serde(default)]
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Redis validation
        if self.redis.enabled && self.redis.url.trim().is_empty() {
            return Err("redis.enabled=true requires redis.url".into());
        }
        if self.redis.pool_size == 0 {
            return Err("redis.pool_size must be > 0".into());
        }
        // Cache validation
        if self.cache.ttl_secs == 0 {
            return Err("cache.ttl_secs must be > 0".into());
        }
        if self.cache.timeout_ms == 0 {
            return Err("cache.timeout_ms must be > 0".into());
        }
        // Postgres validation
        if self.postgres.url.trim().is_empty() {
            return Err("postgres.url is required".into());
        }
        if self.postgres.max_connections == 0 {
            return Err("postgres.max_connections must be > 0".into());
        }
        if self.postgres.query_timeout_ms == 0 {
            return Err("postgres.query_timeout_ms must be > 0".into());
        }
        rolegate_postgres::quote_table(&self.postgres.table)
            .map_err(|e| format!("postgres.table: {e}"))?;
        // Auth validation
        if self.auth.secret.is_empty() {
            return Err("auth.secret is required".into());
        }
        self.auth.algorithm()?;
        for (name, claim) in [
            ("auth.roles_claim", &self.auth.roles_claim),
            ("auth.username_claim", &self.auth.username_claim),
            ("auth.designations_claim", &self.auth.designations_claim),
        ] {
            if claim.trim().is_empty() {
                return Err(format!("{name} must not be empty"));
            }
        }
        Ok(())
    }

    /// Resolver tuning derived from the `cache` and `postgres` sections.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            ttl: Duration::from_secs(self.cache.ttl_secs),
            cache_timeout: Duration::from_millis(self.cache.timeout_ms),
            store_timeout: Duration::from_millis(self.postgres.query_timeout_ms),
            cache_failure_policy: self.cache.failure_policy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Permission cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Sliding TTL of a cached role, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Time budget of a single cache call, in milliseconds
    #[serde(default = "default_cache_timeout_ms")]
    pub timeout_ms: u64,

    /// "degrade" (continue store-only) or "fail"
    #[serde(default)]
    pub failure_policy: CacheFailurePolicy,

    /// Eviction sweep interval of the local cache, in seconds (0 disables it)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    180 // 3 minutes
}

fn default_cache_timeout_ms() -> u64 {
    500
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            timeout_ms: default_cache_timeout_ms(),
            failure_policy: CacheFailurePolicy::default(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// Access token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to verify token signatures
    #[serde(default)]
    pub secret: String,

    /// Signature algorithm: HS256, HS384 or HS512
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Expected `aud`; audience is not checked when unset
    #[serde(default)]
    pub audience: Option<String>,

    /// Clock skew tolerated on `exp`, in seconds
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,

    #[serde(default = "default_roles_claim")]
    pub roles_claim: String,

    #[serde(default = "default_username_claim")]
    pub username_claim: String,

    #[serde(default = "default_designations_claim")]
    pub designations_claim: String,
}

impl AuthConfig {
    /// Parsed signature algorithm.
    pub fn algorithm(&self) -> Result<jsonwebtoken::Algorithm, String> {
        match self.algorithm.to_ascii_uppercase().as_str() {
            "HS256" => Ok(jsonwebtoken::Algorithm::HS256),
            "HS384" => Ok(jsonwebtoken::Algorithm::HS384),
            "HS512" => Ok(jsonwebtoken::Algorithm::HS512),
            other => Err(format!(
                "auth.algorithm must be one of HS256, HS384, HS512 (got {other:?})"
            )),
        }
    }
}

fn default_algorithm() -> String {
    "HS256".into()
}

fn default_leeway_secs() -> u64 {
    60
}

fn default_roles_claim() -> String {
    "roles".into()
}

fn default_username_claim() -> String {
    "sub".into()
}

fn default_designations_claim() -> String {
    "designations".into()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            algorithm: default_algorithm(),
            audience: None,
            leeway_secs: default_leeway_secs(),
            roles_claim: default_roles_claim(),
            username_claim: default_username_claim(),
            designations_claim: default_designations_claim(),
        }
    }
}

/// Layered loading of [`AppConfig`].
///
/// Sources, lowest precedence first:
///
/// 1. `rolegate.toml` (or the path given to `load_config`); a missing file is skipped
/// 2. `ROLEGATE__<SECTION>__<KEY>` environment variables, e.g. `ROLEGATE__CACHE__TTL_SECS=300`
///
/// A `.env` file in the working directory is read into the environment first,
/// so it feeds step 2.
pub mod loader {
    use std::io::ErrorKind;
    use std::path::Path;

    use config::{Config, Environment, File};

    use super::AppConfig;

    pub const DEFAULT_CONFIG_FILE: &str = "rolegate.toml";
    pub const ENV_PREFIX: &str = "ROLEGATE";

    /// Read `.env` into the process environment; a missing file is fine.
    pub fn load_dotenv() {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(dotenvy::Error::Io(e)) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env file"),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a message naming the failing stage (build, deserialize) or the
    /// first invalid field.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        load_dotenv();

        let file = Path::new(path.unwrap_or(DEFAULT_CONFIG_FILE));
        let config = Config::builder()
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| format!("config build error: {e}"))?;

        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        app.validate()?;

        tracing::debug!(file = %file.display(), "configuration loaded");
        Ok(app)
    }
}
