//! PostgreSQL record store for rolegate.
//!
//! Reads role permission records from a read-only table or view, filtered by
//! principal (`first_name`), designation (`designation_name`) and a set of
//! role names. Two layouts are supported, see [`RecordShape`].
//!
//! # Example
//!
//! ```ignore
//! use rolegate_postgres::{PostgresConfig, PostgresRecordStore};
//!
//! let store = PostgresRecordStore::connect(&PostgresConfig::default()).await?;
//! let records = store.fetch_records("alice", "Manager", &roles).await?;
//! ```

pub mod config;
pub mod store;

use std::sync::LazyLock;
use std::time::Duration;

use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_postgres::Postgres;

pub use config::{PostgresConfig, RecordShape};
pub use store::PostgresRecordStore;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while setting up the record store.
///
/// Query failures at resolve time are reported as
/// [`StoreError`](rolegate_core::StoreError) instead.
#[derive(Debug, thiserror::Error)]
pub enum PostgresStoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// The configured table name is not a plain SQL identifier.
    #[error("Invalid table name: {0:?}")]
    InvalidTable(String),
}

impl PostgresStoreError {
    /// Create an `InvalidTable` error.
    #[must_use]
    pub fn invalid_table(name: impl Into<String>) -> Self {
        Self::InvalidTable(name.into())
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Returns `true` if the configuration was rejected.
    #[must_use]
    pub fn is_invalid_table(&self) -> bool {
        matches!(self, Self::InvalidTable(_))
    }
}

/// Result type for store setup.
pub type PostgresStoreResult<T> = Result<T, PostgresStoreError>;

// =============================================================================
// Connection
// =============================================================================

/// Open a connection pool sized and timed per `config`.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(config: &PostgresConfig) -> PostgresStoreResult<PgPool> {
    let pool = PoolOptions::<Postgres>::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
        .connect(&config.url)
        .await?;
    Ok(pool)
}

// =============================================================================
// Identifiers
// =============================================================================

/// `name` or `schema.name`, each part a plain unquoted identifier.
static TABLE_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}(\.[A-Za-z_][A-Za-z0-9_]{0,62})?$")
        .expect("Invalid table regex")
});

/// Validate a table name and return it quoted for interpolation into SQL.
///
/// # Errors
///
/// Returns [`PostgresStoreError::InvalidTable`] for anything but `name` or
/// `schema.name` made of letters, digits and underscores.
pub fn quote_table(name: &str) -> PostgresStoreResult<String> {
    if !TABLE_REGEX.is_match(name) {
        return Err(PostgresStoreError::invalid_table(name));
    }
    Ok(name
        .split('.')
        .map(|part| format!("\"{part}\""))
        .collect::<Vec<_>>()
        .join("."))
}
