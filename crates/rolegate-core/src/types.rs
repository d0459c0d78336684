//! Domain types: role names, permission maps, requests and results.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of every cache key written or read by the resolver.
pub const CACHE_KEY_PREFIX: &str = "role::";

/// Build the cache key for a role (`role::<name>`).
pub fn cache_key(role: &RoleName) -> String {
    format!("{CACHE_KEY_PREFIX}{}", role.as_str())
}

// =============================================================================
// RoleName
// =============================================================================

/// Opaque role identifier, used verbatim as the cache-key suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(String);

impl RoleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Cache key for this role.
    pub fn cache_key(&self) -> String {
        cache_key(self)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RoleName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for RoleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RoleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// PermissionMap
// =============================================================================

/// Screen → set of permission actions granted on that screen.
///
/// Sets are deduplicated; ordering is not significant. Serialises as a JSON
/// object of arrays, e.g. `{"Dashboard":["EDIT","VIEW"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMap(BTreeMap<String, BTreeSet<String>>);

impl PermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `permission` on `screen`, creating the screen entry on first use.
    ///
    /// Returns `false` if the permission was already present.
    pub fn grant(&mut self, screen: impl Into<String>, permission: impl Into<String>) -> bool {
        self.0
            .entry(screen.into())
            .or_default()
            .insert(permission.into())
    }

    /// Returns `true` if `permission` is granted on `screen`.
    pub fn allows(&self, screen: &str, permission: &str) -> bool {
        self.0
            .get(screen)
            .is_some_and(|perms| perms.contains(permission))
    }

    pub fn permissions_for(&self, screen: &str) -> Option<&BTreeSet<String>> {
        self.0.get(screen)
    }

    pub fn screens(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.0.iter()
    }

    /// Number of screens with at least one grant.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S, P> FromIterator<(S, P)> for PermissionMap
where
    S: Into<String>,
    P: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (S, P)>>(iter: I) -> Self {
        let mut map = PermissionMap::new();
        for (screen, permission) in iter {
            map.grant(screen, permission);
        }
        map
    }
}

// =============================================================================
// ResolutionRequest
// =============================================================================

/// Input of a single resolution call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    roles: Vec<RoleName>,
    principal: String,
    designation: Option<String>,
}

impl ResolutionRequest {
    pub fn new(
        principal: impl Into<String>,
        roles: impl IntoIterator<Item = RoleName>,
        designation: Option<String>,
    ) -> Self {
        Self {
            roles: roles.into_iter().collect(),
            principal: principal.into(),
            designation: designation.filter(|d| !d.trim().is_empty()),
        }
    }

    /// Build a request from raw identity claims.
    ///
    /// The first designation is used; a blank first designation counts as missing.
    pub fn from_claims(
        roles: Vec<String>,
        username: impl Into<String>,
        designations: Vec<String>,
    ) -> Self {
        Self::new(
            username,
            roles.into_iter().map(RoleName::from),
            designations.into_iter().next(),
        )
    }

    pub fn roles(&self) -> &[RoleName] {
        &self.roles
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn designation(&self) -> Option<&str> {
        self.designation.as_deref()
    }
}

/// Identity claims read from a single access token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenIdentity {
    pub roles: Vec<String>,
    pub username: String,
    pub designations: Vec<String>,
}

impl From<TokenIdentity> for ResolutionRequest {
    fn from(identity: TokenIdentity) -> Self {
        Self::from_claims(identity.roles, identity.username, identity.designations)
    }
}

// =============================================================================
// ResolutionResult
// =============================================================================

/// Role → permissions for every requested role that resolved successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolutionResult(BTreeMap<RoleName, PermissionMap>);

impl ResolutionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: RoleName, permissions: PermissionMap) {
        self.0.insert(role, permissions);
    }

    pub fn get(&self, role: &str) -> Option<&PermissionMap> {
        self.0.get(role)
    }

    pub fn contains_role(&self, role: &str) -> bool {
        self.0.contains_key(role)
    }

    /// Returns `true` if `role` resolved and grants `permission` on `screen`.
    pub fn allows(&self, role: &str, screen: &str, permission: &str) -> bool {
        self.get(role)
            .is_some_and(|perms| perms.allows(screen, permission))
    }

    pub fn roles(&self) -> impl Iterator<Item = &RoleName> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RoleName, &PermissionMap)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<RoleName, PermissionMap> {
        self.0
    }
}

impl FromIterator<(RoleName, PermissionMap)> for ResolutionResult {
    fn from_iter<I: IntoIterator<Item = (RoleName, PermissionMap)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
