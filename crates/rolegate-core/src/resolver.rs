//! Cache-aside permission resolver.
//!
//! ## Resolution Flow
//!
//! ```text
//! roles → role::<name> keys → batch_get ─┬─ hit  → result + renew_ttl
//!                                        └─ miss → fetch_records(misses) → decode
//!                                                     → result + batch_set_with_ttl
//! ```
//!
//! ## Cache Degradation
//!
//! Every cache call runs under its own timeout. With
//! [`CacheFailurePolicy::Degrade`] a failed or timed-out read counts as a miss
//! and a failed renew/write is logged and skipped, so resolution keeps working
//! store-only while the cache tier is down. [`CacheFailurePolicy::Fail`] turns
//! the same failures into [`ResolveError::CacheUnavailable`].

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::decoder;
use crate::error::{CacheError, CacheResult, ResolveError, ResolveResult, StoreError};
use crate::gateway::{CacheGateway, RecordStore};
use crate::metrics;
use crate::record::RawPermissionRecord;
use crate::types::{PermissionMap, ResolutionRequest, ResolutionResult, RoleName};

/// Default sliding TTL of a cached role.
pub const DEFAULT_TTL: Duration = Duration::from_secs(180);

const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(500);
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// What to do when a cache call fails or times out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheFailurePolicy {
    /// Log, treat reads as misses and continue against the store.
    #[default]
    Degrade,
    /// Abort the call with [`ResolveError::CacheUnavailable`].
    Fail,
}

/// Resolver tuning.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Sliding TTL applied on renewal and population.
    pub ttl: Duration,
    /// Time budget of each cache call.
    pub cache_timeout: Duration,
    /// Time budget of the store fallback.
    pub store_timeout: Duration,
    pub cache_failure_policy: CacheFailurePolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            cache_failure_policy: CacheFailurePolicy::default(),
        }
    }
}

/// Resolves role permissions through the cache tier, falling back to the
/// record store for misses only.
#[derive(Clone)]
pub struct PermissionResolver {
    cache: Arc<dyn CacheGateway>,
    store: Arc<dyn RecordStore>,
    config: ResolverConfig,
}

impl PermissionResolver {
    /// Create a resolver with the default configuration.
    pub fn new(cache: Arc<dyn CacheGateway>, store: Arc<dyn RecordStore>) -> Self {
        Self::with_config(cache, store, ResolverConfig::default())
    }

    pub fn with_config(
        cache: Arc<dyn CacheGateway>,
        store: Arc<dyn RecordStore>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            cache,
            store,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve every role of `request`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::IdentityIncomplete`] if the request has roles but no designation.
    /// - [`ResolveError::StoreUnavailable`] if the store fallback fails.
    /// - [`ResolveError::CacheUnavailable`] only under [`CacheFailurePolicy::Fail`].
    pub async fn resolve(&self, request: &ResolutionRequest) -> ResolveResult<ResolutionResult> {
        self.resolve_request(request, None).await
    }

    /// Like [`resolve`](Self::resolve), with every I/O call also bounded by `deadline`.
    pub async fn resolve_with_deadline(
        &self,
        request: &ResolutionRequest,
        deadline: Instant,
    ) -> ResolveResult<ResolutionResult> {
        self.resolve_request(request, Some(deadline)).await
    }

    /// Merge procedure: cache first, store for the misses, write the misses back.
    pub async fn resolve_roles(
        &self,
        roles: &[RoleName],
        principal: &str,
        designation: &str,
    ) -> ResolveResult<ResolutionResult> {
        self.merge(roles, principal, designation, None).await
    }

    async fn resolve_request(
        &self,
        request: &ResolutionRequest,
        deadline: Option<Instant>,
    ) -> ResolveResult<ResolutionResult> {
        if request.roles().is_empty() {
            return Ok(ResolutionResult::new());
        }
        let Some(designation) = request.designation() else {
            return Err(ResolveError::identity_incomplete("designation"));
        };

        self.merge(request.roles(), request.principal(), designation, deadline)
            .await
    }

    async fn merge(
        &self,
        roles: &[RoleName],
        principal: &str,
        designation: &str,
        deadline: Option<Instant>,
    ) -> ResolveResult<ResolutionResult> {
        let roles = distinct(roles);
        if roles.is_empty() {
            return Ok(ResolutionResult::new());
        }

        tracing::info!(
            principal = %principal,
            designation = %designation,
            roles = ?roles,
            "resolving role permissions"
        );

        let keys: Vec<String> = roles.iter().map(|role| role.cache_key()).collect();
        let cached = self.read_cache(&keys, deadline).await?;

        let mut result = ResolutionResult::new();
        let mut hit_keys = Vec::new();
        let mut missed = Vec::new();
        for ((role, key), entry) in roles.iter().zip(keys).zip(cached) {
            match entry {
                Some(permissions) => {
                    tracing::debug!(role = %role, "cache hit");
                    result.insert((*role).clone(), permissions);
                    hit_keys.push(key);
                }
                None => {
                    tracing::debug!(role = %role, "cache miss");
                    missed.push((*role).clone());
                }
            }
        }
        metrics::record_cache_hits(hit_keys.len());
        metrics::record_cache_misses(missed.len());

        self.renew_hits(&hit_keys, deadline).await?;

        if missed.is_empty() {
            return Ok(result);
        }

        let records = match self
            .fetch_missed(principal, designation, &missed, deadline)
            .await
        {
            Ok(records) => records,
            Err(source) => {
                tracing::warn!(
                    roles = ?missed,
                    error = %source,
                    "record store unavailable"
                );
                return Err(ResolveError::StoreUnavailable {
                    source,
                    resolved: result,
                });
            }
        };

        let fresh = decode_records(&missed, records);
        if fresh.is_empty() {
            return Ok(result);
        }

        let entries: Vec<(String, PermissionMap)> = fresh
            .iter()
            .map(|(role, permissions)| (role.cache_key(), permissions.clone()))
            .collect();
        tracing::info!(
            roles = ?fresh.iter().map(|(role, _)| role.as_str()).collect::<Vec<_>>(),
            "populating cache"
        );
        self.write_cache(&entries, deadline).await?;

        for (role, permissions) in fresh {
            result.insert(role, permissions);
        }
        Ok(result)
    }

    async fn read_cache(
        &self,
        keys: &[String],
        deadline: Option<Instant>,
    ) -> ResolveResult<Vec<Option<PermissionMap>>> {
        let limit = budget(self.config.cache_timeout, deadline);
        match bounded_cache_call("batch_get", limit, self.cache.batch_get(keys)).await {
            Ok(values) if values.len() == keys.len() => Ok(values),
            Ok(values) => {
                let err = CacheError::backend(format!(
                    "batch_get returned {} values for {} keys",
                    values.len(),
                    keys.len()
                ));
                self.absorb_cache_error("batch_get", err)?;
                Ok(vec![None; keys.len()])
            }
            Err(err) => {
                self.absorb_cache_error("batch_get", err)?;
                Ok(vec![None; keys.len()])
            }
        }
    }

    /// Sliding expiration: every hit resets its key's TTL.
    async fn renew_hits(&self, keys: &[String], deadline: Option<Instant>) -> ResolveResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let limit = budget(self.config.cache_timeout, deadline);
        let ttl = self.config.ttl;
        let outcomes = join_all(keys.iter().map(|key| {
            bounded_cache_call("renew_ttl", limit, self.cache.renew_ttl(key, ttl))
        }))
        .await;

        for (key, outcome) in keys.iter().zip(outcomes) {
            match outcome {
                Ok(true) => {}
                Ok(false) => tracing::debug!(key = %key, "key expired before renewal"),
                Err(err) => self.absorb_cache_error("renew_ttl", err)?,
            }
        }
        Ok(())
    }

    async fn fetch_missed(
        &self,
        principal: &str,
        designation: &str,
        missed: &[RoleName],
        deadline: Option<Instant>,
    ) -> Result<Vec<RawPermissionRecord>, StoreError> {
        let limit = budget(self.config.store_timeout, deadline);
        metrics::record_store_fetch();
        match tokio::time::timeout(
            limit,
            self.store.fetch_records(principal, designation, missed),
        )
        .await
        {
            Ok(records) => records,
            Err(_) => Err(StoreError::Timeout { after: limit }),
        }
    }

    async fn write_cache(
        &self,
        entries: &[(String, PermissionMap)],
        deadline: Option<Instant>,
    ) -> ResolveResult<()> {
        let limit = budget(self.config.cache_timeout, deadline);
        let ttl = self.config.ttl;
        match bounded_cache_call(
            "batch_set",
            limit,
            self.cache.batch_set_with_ttl(entries, ttl),
        )
        .await
        {
            Ok(()) => Ok(()),
            Err(err) => self.absorb_cache_error("batch_set", err),
        }
    }

    /// Apply the configured [`CacheFailurePolicy`] to a failed cache call.
    fn absorb_cache_error(&self, op: &'static str, err: CacheError) -> ResolveResult<()> {
        metrics::record_cache_error(op);
        match self.config.cache_failure_policy {
            CacheFailurePolicy::Degrade => {
                tracing::warn!(op, error = %err, "cache call failed, continuing without cache");
                Ok(())
            }
            CacheFailurePolicy::Fail => Err(ResolveError::CacheUnavailable(err)),
        }
    }
}

/// Run a cache call under `limit`, mapping expiry to [`CacheError::Timeout`].
async fn bounded_cache_call<T>(
    op: &'static str,
    limit: Duration,
    call: impl Future<Output = CacheResult<T>>,
) -> CacheResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CacheError::Timeout { op, after: limit }),
    }
}

/// Clamp a per-call timeout to what is left before `deadline`.
fn budget(limit: Duration, deadline: Option<Instant>) -> Duration {
    match deadline {
        Some(deadline) => limit.min(deadline.saturating_duration_since(Instant::now())),
        None => limit,
    }
}

/// Drop repeated role names, keeping first-occurrence order.
fn distinct(roles: &[RoleName]) -> Vec<&RoleName> {
    let mut seen = HashSet::with_capacity(roles.len());
    roles.iter().filter(|role| seen.insert(*role)).collect()
}

/// Decode store records for the missed roles, in missed-role order.
///
/// Records for roles that were not asked for are ignored; a role returned more
/// than once keeps its first record. Roles whose record fails to decode are
/// logged and left out.
fn decode_records(
    missed: &[RoleName],
    records: Vec<RawPermissionRecord>,
) -> Vec<(RoleName, PermissionMap)> {
    let mut by_role: HashMap<RoleName, RawPermissionRecord> = HashMap::with_capacity(records.len());
    for record in records {
        if !missed.contains(&record.role) {
            tracing::debug!(role = %record.role, "ignoring record for unrequested role");
            continue;
        }
        by_role.entry(record.role.clone()).or_insert(record);
    }

    missed
        .iter()
        .filter_map(|role| {
            let record = by_role.remove(role)?;
            match decoder::decode(&record) {
                Ok(permissions) => Some((record.role, permissions)),
                Err(err) => {
                    metrics::record_decode_failure();
                    tracing::warn!(role = %role, error = %err, "failed to decode permission record");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        let roles: Vec<RoleName> = ["B", "A", "B", "C", "A"].into_iter().map(Into::into).collect();
        let names: Vec<&str> = distinct(&roles).into_iter().map(RoleName::as_str).collect();
        assert_eq!(names, ["B", "A", "C"]);
    }

    #[test]
    fn test_budget_without_deadline() {
        assert_eq!(
            budget(Duration::from_millis(500), None),
            Duration::from_millis(500)
        );
    }

    #[tokio::test]
    async fn test_budget_clamps_to_deadline() {
        let deadline = Instant::now() + Duration::from_millis(50);
        assert!(budget(Duration::from_secs(5), Some(deadline)) <= Duration::from_millis(50));

        let passed = Instant::now() - Duration::from_millis(1);
        assert_eq!(budget(Duration::from_secs(5), Some(passed)), Duration::ZERO);
    }

    #[test]
    fn test_decode_records_filters_and_orders() {
        let missed: Vec<RoleName> = vec!["B".into(), "C".into(), "D".into()];
        let records = vec![
            RawPermissionRecord::from_pairs("C", [("Reports", "VIEW")]),
            RawPermissionRecord::from_pairs("X", [("Admin", "EDIT")]),
            RawPermissionRecord::json("B", Some("{broken".into())),
            RawPermissionRecord::from_pairs("C", [("Reports", "EDIT")]),
        ];

        let fresh = decode_records(&missed, records);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].0.as_str(), "C");
        assert!(fresh[0].1.allows("Reports", "VIEW"));
        assert!(!fresh[0].1.allows("Reports", "EDIT"));
    }

    #[test]
    fn test_cache_failure_policy_serde() {
        let policy: CacheFailurePolicy = serde_json::from_str("\"fail\"").unwrap();
        assert_eq!(policy, CacheFailurePolicy::Fail);
        assert_eq!(CacheFailurePolicy::default(), CacheFailurePolicy::Degrade);
    }
}
