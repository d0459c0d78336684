//! In-memory fakes for the resolver's collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rolegate_core::{
    CacheError, CacheGateway, CacheResult, ClaimsError, ClaimsProvider, ClaimsResult,
    PermissionMap, RawPermissionRecord, RecordStore, RoleName, StoreError, StoreResult,
};

// =============================================================================
// Cache
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCall {
    BatchGet(Vec<String>),
    Renew(String, Duration),
    BatchSet(Vec<String>, Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFault {
    /// Every call returns a backend error.
    Error,
    /// Every call sleeps far beyond any test timeout.
    Hang,
}

/// Cache fake that records every call and stores `(value, ttl)` per key.
#[derive(Default)]
pub struct FakeCache {
    entries: Mutex<HashMap<String, (PermissionMap, Duration)>>,
    calls: Mutex<Vec<CacheCall>>,
    fault: Mutex<Option<CacheFault>>,
    expire_after_read: Mutex<bool>,
}

impl FakeCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, role: &str, permissions: PermissionMap) {
        self.entries.lock().insert(
            RoleName::from(role).cache_key(),
            (permissions, Duration::from_secs(180)),
        );
    }

    pub fn remove(&self, role: &str) {
        self.entries.lock().remove(&RoleName::from(role).cache_key());
    }

    pub fn set_fault(&self, fault: Option<CacheFault>) {
        *self.fault.lock() = fault;
    }

    /// Drop every entry right after it is read, simulating expiry between
    /// the read and the renewal.
    pub fn set_expire_after_read(&self, expire: bool) {
        *self.expire_after_read.lock() = expire;
    }

    pub fn entry(&self, key: &str) -> Option<(PermissionMap, Duration)> {
        self.entries.lock().get(key).cloned()
    }

    pub fn calls(&self) -> Vec<CacheCall> {
        self.calls.lock().clone()
    }

    pub fn renewed_keys(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                CacheCall::Renew(key, _) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    async fn check_fault(&self) -> CacheResult<()> {
        let fault = *self.fault.lock();
        match fault {
            None => Ok(()),
            Some(CacheFault::Error) => Err(CacheError::backend("connection refused")),
            Some(CacheFault::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl CacheGateway for FakeCache {
    async fn batch_get(&self, keys: &[String]) -> CacheResult<Vec<Option<PermissionMap>>> {
        self.calls.lock().push(CacheCall::BatchGet(keys.to_vec()));
        self.check_fault().await?;
        let expire = *self.expire_after_read.lock();
        let mut entries = self.entries.lock();
        let values = keys
            .iter()
            .map(|key| entries.get(key).map(|(value, _)| value.clone()))
            .collect();
        if expire {
            entries.clear();
        }
        Ok(values)
    }

    async fn renew_ttl(&self, key: &str, ttl: Duration) -> CacheResult<bool> {
        self.calls.lock().push(CacheCall::Renew(key.to_string(), ttl));
        self.check_fault().await?;
        match self.entries.lock().get_mut(key) {
            Some(entry) => {
                entry.1 = ttl;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn batch_set_with_ttl(
        &self,
        entries: &[(String, PermissionMap)],
        ttl: Duration,
    ) -> CacheResult<()> {
        self.calls.lock().push(CacheCall::BatchSet(
            entries.iter().map(|(key, _)| key.clone()).collect(),
            ttl,
        ));
        self.check_fault().await?;
        let mut stored = self.entries.lock();
        for (key, value) in entries {
            stored.insert(key.clone(), (value.clone(), ttl));
        }
        Ok(())
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQuery {
    pub principal: String,
    pub designation: String,
    pub roles: Vec<String>,
}

/// Record store fake keyed by role name.
#[derive(Default)]
pub struct FakeStore {
    records: Mutex<Vec<RawPermissionRecord>>,
    queries: Mutex<Vec<StoreQuery>>,
    failing: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, record: RawPermissionRecord) {
        self.records.lock().push(record);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    pub fn queries(&self) -> Vec<StoreQuery> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn fetch_records(
        &self,
        principal: &str,
        designation: &str,
        roles: &[RoleName],
    ) -> StoreResult<Vec<RawPermissionRecord>> {
        self.queries.lock().push(StoreQuery {
            principal: principal.to_string(),
            designation: designation.to_string(),
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
        });
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.failing.lock() {
            return Err(StoreError::query("connection reset by peer"));
        }
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|record| roles.contains(&record.role))
            .cloned()
            .collect())
    }
}

// =============================================================================
// Claims
// =============================================================================

/// Claims fake that ignores the token and returns fixed values.
pub struct FakeClaims {
    pub roles: Vec<String>,
    pub username: String,
    pub designations: Vec<String>,
    pub invalid: bool,
}

impl FakeClaims {
    pub fn new(roles: &[&str], username: &str, designations: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            roles: roles.iter().map(|s| s.to_string()).collect(),
            username: username.to_string(),
            designations: designations.iter().map(|s| s.to_string()).collect(),
            invalid: false,
        })
    }

    fn check(&self) -> ClaimsResult<()> {
        if self.invalid {
            return Err(ClaimsError::invalid_token("bad signature"));
        }
        Ok(())
    }
}

impl ClaimsProvider for FakeClaims {
    fn extract_roles(&self, _token: &str) -> ClaimsResult<Vec<String>> {
        self.check()?;
        Ok(self.roles.clone())
    }

    fn extract_username(&self, _token: &str) -> ClaimsResult<String> {
        self.check()?;
        Ok(self.username.clone())
    }

    fn extract_designations(&self, _token: &str) -> ClaimsResult<Vec<String>> {
        self.check()?;
        Ok(self.designations.clone())
    }
}

/// `(screen, permission)` pairs → [`PermissionMap`].
pub fn perms(pairs: &[(&str, &str)]) -> PermissionMap {
    pairs.iter().copied().collect()
}
