//! Deployment glue for rolegate.
//!
//! - [`config`]: `AppConfig` loaded from `rolegate.toml` and `ROLEGATE__*`
//!   environment variables.
//! - [`observability`]: tracing subscriber with a reloadable level.
//! - [`claims`]: JWT claims provider (HMAC).
//! - [`bootstrap`]: builds a `PermissionService` from an `AppConfig`.
//!
//! # Example
//!
//! ```ignore
//! use rolegate_service::{bootstrap, config::loader, observability};
//!
//! let cfg = loader::load_config(None)?;
//! observability::init_tracing_with_level(&cfg.logging.level);
//! let app = bootstrap::build_service(&cfg).await?;
//! let permissions = app.service.get_permissions(token).await?;
//! ```

pub mod bootstrap;
pub mod claims;
pub mod config;
pub mod observability;

pub use bootstrap::{BootstrapError, Bootstrapped, build_service};
pub use claims::JwtClaimsProvider;
pub use config::AppConfig;
