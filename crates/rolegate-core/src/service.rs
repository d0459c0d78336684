//! Token-level entry point.

use std::sync::Arc;

use crate::error::ResolveResult;
use crate::gateway::ClaimsProvider;
use crate::resolver::PermissionResolver;
use crate::types::{ResolutionRequest, ResolutionResult};

/// Resolves the permissions of the principal behind an access token.
#[derive(Clone)]
pub struct PermissionService {
    claims: Arc<dyn ClaimsProvider>,
    resolver: PermissionResolver,
}

impl PermissionService {
    pub fn new(claims: Arc<dyn ClaimsProvider>, resolver: PermissionResolver) -> Self {
        Self { claims, resolver }
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Resolve the permissions of every role carried by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Claims`](crate::ResolveError::Claims) if the token
    /// cannot be read, otherwise whatever [`PermissionResolver::resolve`] returns.
    pub async fn get_permissions(&self, token: &str) -> ResolveResult<ResolutionResult> {
        let request = ResolutionRequest::from(self.claims.extract_identity(token)?);
        self.resolver.resolve(&request).await
    }
}
