//! HMAC-signed JWT claims provider.
//!
//! Verifies the signature and expiry of every token before reading claims;
//! `extract_identity` reads all three claims off a single verification.
//! Claim names are configurable; by default roles come from `roles`, the
//! principal from `sub` and designations from `designations`.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use rolegate_core::{ClaimsError, ClaimsProvider, ClaimsResult, TokenIdentity};
use serde_json::{Map, Value};

use crate::config::AuthConfig;

/// Reads identity claims out of HS256/HS384/HS512 tokens.
#[derive(Clone)]
pub struct JwtClaimsProvider {
    decoding_key: DecodingKey,
    validation: Validation,
    roles_claim: String,
    username_claim: String,
    designations_claim: String,
}

impl std::fmt::Debug for JwtClaimsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtClaimsProvider")
            .field("algorithms", &self.validation.algorithms)
            .field("roles_claim", &self.roles_claim)
            .field("username_claim", &self.username_claim)
            .field("designations_claim", &self.designations_claim)
            .finish_non_exhaustive()
    }
}

impl JwtClaimsProvider {
    /// Build a provider from the `auth` configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error for an unsupported algorithm.
    pub fn from_config(config: &AuthConfig) -> Result<Self, String> {
        let algorithm = config.algorithm()?;
        let mut provider = Self::new(config.secret.as_bytes(), algorithm);

        provider.validation.leeway = config.leeway_secs;
        match &config.audience {
            Some(audience) => provider.validation.set_audience(&[audience]),
            None => provider.validation.validate_aud = false,
        }
        provider.roles_claim = config.roles_claim.clone();
        provider.username_claim = config.username_claim.clone();
        provider.designations_claim = config.designations_claim.clone();
        Ok(provider)
    }

    /// Provider with default claim names and no audience check.
    pub fn new(secret: &[u8], algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_aud = false;

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            roles_claim: "roles".into(),
            username_claim: "sub".into(),
            designations_claim: "designations".into(),
        }
    }

    /// Verify `token` and return its claim set.
    fn verify(&self, token: &str) -> ClaimsResult<Map<String, Value>> {
        let token_data =
            jsonwebtoken::decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
                .map_err(|e| {
                    tracing::debug!(error = %e, "JWT validation failed");
                    ClaimsError::invalid_token(e.to_string())
                })?;
        Ok(token_data.claims)
    }

    fn roles_in(&self, claims: &Map<String, Value>) -> ClaimsResult<Vec<String>> {
        string_list(&self.roles_claim, claims.get(&self.roles_claim))
    }

    fn username_in(&self, claims: &Map<String, Value>) -> ClaimsResult<String> {
        match claims.get(&self.username_claim) {
            Some(Value::String(username)) if !username.is_empty() => Ok(username.clone()),
            Some(Value::String(_)) | Some(Value::Null) | None => {
                Err(ClaimsError::missing_claim(&self.username_claim))
            }
            Some(_) => Err(ClaimsError::invalid_claim(
                &self.username_claim,
                "expected a string",
            )),
        }
    }

    fn designations_in(&self, claims: &Map<String, Value>) -> ClaimsResult<Vec<String>> {
        string_list(
            &self.designations_claim,
            claims.get(&self.designations_claim),
        )
    }
}

impl ClaimsProvider for JwtClaimsProvider {
    fn extract_roles(&self, token: &str) -> ClaimsResult<Vec<String>> {
        self.roles_in(&self.verify(token)?)
    }

    fn extract_username(&self, token: &str) -> ClaimsResult<String> {
        self.username_in(&self.verify(token)?)
    }

    fn extract_designations(&self, token: &str) -> ClaimsResult<Vec<String>> {
        self.designations_in(&self.verify(token)?)
    }

    fn extract_identity(&self, token: &str) -> ClaimsResult<TokenIdentity> {
        let claims = self.verify(token)?;
        Ok(TokenIdentity {
            roles: self.roles_in(&claims)?,
            username: self.username_in(&claims)?,
            designations: self.designations_in(&claims)?,
        })
    }
}

/// A list claim: absent or null is empty, a lone string is a one-item list.
fn string_list(claim: &str, value: Option<&Value>) -> ClaimsResult<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(item)) => Ok(vec![item.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(ClaimsError::invalid_claim(claim, "expected an array of strings")),
            })
            .collect(),
        Some(_) => Err(ClaimsError::invalid_claim(
            claim,
            "expected an array of strings",
        )),
    }
}
