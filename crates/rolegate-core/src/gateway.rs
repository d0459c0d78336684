//! Capabilities the resolver is built from.
//!
//! Implementations live in sibling crates (Redis, in-process, PostgreSQL, JWT);
//! the resolver only ever sees these traits, shared as `Arc<dyn …>`.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CacheResult, ClaimsResult, StoreResult};
use crate::record::RawPermissionRecord;
use crate::types::{PermissionMap, RoleName, TokenIdentity};

/// Key-value cache tier holding one [`PermissionMap`] per `role::<name>` key.
#[async_trait]
pub trait CacheGateway: Send + Sync {
    /// Read every key in one round trip.
    ///
    /// Returns exactly one entry per key, in key order; `None` for keys that are
    /// absent or expired.
    async fn batch_get(&self, keys: &[String]) -> CacheResult<Vec<Option<PermissionMap>>>;

    /// Reset the remaining lifetime of `key` to `ttl` without touching its value.
    ///
    /// Returns `false` if the key no longer exists (lost a race with expiry),
    /// which is not an error.
    async fn renew_ttl(&self, key: &str, ttl: Duration) -> CacheResult<bool>;

    /// Write every entry with the same `ttl` as one atomic unit.
    ///
    /// Either all entries are written or the call fails.
    async fn batch_set_with_ttl(
        &self,
        entries: &[(String, PermissionMap)],
        ttl: Duration,
    ) -> CacheResult<()>;
}

/// Authoritative, read-only source of role permission records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch raw records for `roles` belonging to `principal` with `designation`.
    ///
    /// Roles without a matching record are simply absent from the output.
    async fn fetch_records(
        &self,
        principal: &str,
        designation: &str,
        roles: &[RoleName],
    ) -> StoreResult<Vec<RawPermissionRecord>>;
}

/// Reads identity claims out of an access token.
pub trait ClaimsProvider: Send + Sync {
    fn extract_roles(&self, token: &str) -> ClaimsResult<Vec<String>>;

    fn extract_username(&self, token: &str) -> ClaimsResult<String>;

    fn extract_designations(&self, token: &str) -> ClaimsResult<Vec<String>>;

    /// Every identity claim of `token` at once.
    ///
    /// Defaults to the three single-claim reads. Providers that verify the token
    /// override this to verify it once.
    fn extract_identity(&self, token: &str) -> ClaimsResult<TokenIdentity> {
        Ok(TokenIdentity {
            roles: self.extract_roles(token)?,
            username: self.extract_username(token)?,
            designations: self.extract_designations(token)?,
        })
    }
}
