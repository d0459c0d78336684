//! Error types for permission resolution and its collaborators.

use std::time::Duration;

use crate::types::ResolutionResult;

/// Boxed error used to carry backend-specific failures across crate boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Resolve Errors
// =============================================================================

/// Errors surfaced by [`PermissionResolver`](crate::PermissionResolver) and
/// [`PermissionService`](crate::PermissionService).
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A required identity claim (the designation) is missing.
    #[error("Identity incomplete: missing {claim}")]
    IdentityIncomplete {
        /// Name of the missing claim.
        claim: String,
    },

    /// The cache tier failed and the resolver is configured to fail fast.
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(#[source] CacheError),

    /// The record store failed while fetching roles missing from the cache.
    ///
    /// `resolved` holds the cache hits of the same call.
    #[error("Record store unavailable: {source}")]
    StoreUnavailable {
        source: StoreError,
        resolved: ResolutionResult,
    },

    /// The identity token could not be read.
    #[error(transparent)]
    Claims(#[from] ClaimsError),
}

impl ResolveError {
    #[must_use]
    pub fn identity_incomplete(claim: impl Into<String>) -> Self {
        Self::IdentityIncomplete {
            claim: claim.into(),
        }
    }

    #[must_use]
    pub fn is_identity_incomplete(&self) -> bool {
        matches!(self, Self::IdentityIncomplete { .. })
    }

    #[must_use]
    pub fn is_cache_unavailable(&self) -> bool {
        matches!(self, Self::CacheUnavailable(_))
    }

    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }

    /// Roles that were resolved before the call failed, if any.
    pub fn partial_result(&self) -> Option<&ResolutionResult> {
        match self {
            Self::StoreUnavailable { resolved, .. } => Some(resolved),
            _ => None,
        }
    }

    /// Returns `true` if the caller supplied bad identity data (4xx equivalent).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::IdentityIncomplete { .. } | Self::Claims(_))
    }
}

/// Result type for resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

// =============================================================================
// Cache Errors
// =============================================================================

/// Errors from a cache tier call. A plain miss is never an error.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache backend rejected the call or could not be reached.
    #[error("Cache backend error: {0}")]
    Backend(#[source] BoxError),

    /// The call did not finish within its time budget.
    #[error("Cache {op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    /// A value could not be encoded for storage.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    #[must_use]
    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend(err.into())
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type for cache gateway calls.
pub type CacheResult<T> = Result<T, CacheError>;

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the authoritative record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The query failed.
    #[error("Store query failed: {0}")]
    Query(#[source] BoxError),

    /// The query did not finish within its time budget.
    #[error("Store query timed out after {after:?}")]
    Timeout { after: Duration },
}

impl StoreError {
    #[must_use]
    pub fn query(err: impl Into<BoxError>) -> Self {
        Self::Query(err.into())
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type for record store calls.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Claims Errors
// =============================================================================

/// Errors raised while reading identity claims from a token.
#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    /// The token could not be decoded or verified.
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    /// A required claim is absent.
    #[error("Missing required claim: {claim}")]
    MissingClaim { claim: String },

    /// A claim is present but has the wrong type.
    #[error("Invalid claim '{claim}': {message}")]
    InvalidClaim { claim: String, message: String },
}

impl ClaimsError {
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn missing_claim(claim: impl Into<String>) -> Self {
        Self::MissingClaim {
            claim: claim.into(),
        }
    }

    #[must_use]
    pub fn invalid_claim(claim: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidClaim {
            claim: claim.into(),
            message: message.into(),
        }
    }
}

/// Result type for claims extraction.
pub type ClaimsResult<T> = Result<T, ClaimsError>;

// =============================================================================
// Decode Errors
// =============================================================================

/// A single role's raw record could not be turned into a permission map.
///
/// Never fatal to a resolution call: the role is logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum RecordDecodeError {
    /// The JSON payload is not an array of `{screen_name, permission_name}` objects.
    #[error("Malformed screen permission JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// A row carries a screen without a permission or vice versa.
    #[error("Row {index} is missing {missing}")]
    IncompleteRow { index: usize, missing: &'static str },
}
