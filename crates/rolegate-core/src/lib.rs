//! Cache-aside resolution of role screen permissions.
//!
//! ## Architecture
//!
//! ```text
//! token → ClaimsProvider → PermissionResolver → CacheGateway (MGET)
//!                                    ↓ misses only
//!                               RecordStore → decoder → CacheGateway (atomic SET batch)
//! ```
//!
//! - **Cache tier**: `role::<name>` keys with a sliding TTL (3 minutes by default).
//!   Every hit renews the key, every miss is re-fetched and written back in one
//!   atomic batch.
//! - **Record store**: the source of truth, queried only for the roles the cache
//!   did not have.
//!
//! The cache and store are injected as trait objects ([`CacheGateway`],
//! [`RecordStore`]) so tests can substitute in-memory fakes.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rolegate_core::{PermissionResolver, ResolutionRequest};
//!
//! let resolver = PermissionResolver::new(cache, store);
//! let request = ResolutionRequest::from_claims(
//!     vec!["ADMIN".into(), "VIEWER".into()],
//!     "alice",
//!     vec!["Manager".into()],
//! );
//! let permissions = resolver.resolve(&request).await?;
//! assert!(permissions.allows("ADMIN", "Dashboard", "EDIT"));
//! ```

pub mod decoder;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod record;
pub mod resolver;
pub mod service;
pub mod types;

pub use decoder::decode;
pub use error::{
    BoxError, CacheError, CacheResult, ClaimsError, ClaimsResult, RecordDecodeError, ResolveError,
    ResolveResult, StoreError, StoreResult,
};
pub use gateway::{CacheGateway, ClaimsProvider, RecordStore};
pub use record::{PermissionRow, RawPermissionRecord, RecordPayload};
pub use resolver::{CacheFailurePolicy, DEFAULT_TTL, PermissionResolver, ResolverConfig};
pub use service::PermissionService;
pub use types::{
    CACHE_KEY_PREFIX, PermissionMap, ResolutionRequest, ResolutionResult, RoleName, TokenIdentity,
    cache_key,
};
