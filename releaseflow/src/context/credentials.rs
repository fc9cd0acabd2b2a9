//! Run-scoped credentials for environment-gated stages.
//!
//! Tokens are short-lived federated identities minted per stage invocation.
//! They are carried in the run context and must never be cached across runs
//! or stored as process globals.

use crate::errors::AdapterError;
use crate::utils::Timestamp;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A short-lived credential scoped to one deployment environment.
pub struct ScopedToken {
    /// The environment the token is scoped to.
    pub environment: String,
    /// The token value.
    token: String,
    /// When the token was issued.
    pub issued_at: Timestamp,
    /// When the token expires, if bounded.
    pub expires_at: Option<Timestamp>,
}

impl ScopedToken {
    /// Creates a new scoped token.
    #[must_use]
    pub fn new(environment: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            token: token.into(),
            issued_at: crate::utils::now(),
            expires_at: None,
        }
    }

    /// Sets an expiry bound.
    #[must_use]
    pub fn with_expiry(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Reveals the token value for an adapter call.
    #[must_use]
    pub fn reveal(&self) -> &str {
        &self.token
    }

    /// Returns true if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| crate::utils::now() >= at)
    }
}

impl Clone for ScopedToken {
    fn clone(&self) -> Self {
        Self {
            environment: self.environment.clone(),
            token: self.token.clone(),
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }
}

// The token value stays out of Debug output and logs.
impl std::fmt::Debug for ScopedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedToken")
            .field("environment", &self.environment)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mints short-lived tokens for named environments.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Mints a token scoped to the given environment.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::AuthFailure` if no identity can be established
    /// for the environment.
    async fn mint(&self, environment: &str) -> Result<ScopedToken, AdapterError>;
}

/// A token provider backed by a fixed environment/token map.
///
/// Suitable for tests and local runs; a production provider would exchange
/// an ambient federated identity instead.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    tokens: RwLock<HashMap<String, String>>,
}

impl StaticTokenProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for an environment.
    #[must_use]
    pub fn with_token(self, environment: impl Into<String>, token: impl Into<String>) -> Self {
        self.tokens.write().insert(environment.into(), token.into());
        self
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn mint(&self, environment: &str) -> Result<ScopedToken, AdapterError> {
        self.tokens
            .read()
            .get(environment)
            .map(|token| ScopedToken::new(environment, token.clone()))
            .ok_or_else(|| {
                AdapterError::auth_failure(format!(
                    "no identity available for environment '{environment}'"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_scoped_token_redacted_debug() {
        let token = ScopedToken::new("pypi", "secret-value");
        let debug = format!("{token:?}");

        assert!(debug.contains("pypi"));
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-value"));
    }

    #[test]
    fn test_scoped_token_expiry() {
        let fresh = ScopedToken::new("pypi", "t")
            .with_expiry(crate::utils::now() + Duration::minutes(15));
        assert!(!fresh.is_expired());

        let stale = ScopedToken::new("pypi", "t")
            .with_expiry(crate::utils::now() - Duration::seconds(1));
        assert!(stale.is_expired());
    }

    #[tokio::test]
    async fn test_static_provider_mint() {
        let provider = StaticTokenProvider::new().with_token("pypi", "oidc-token");

        let token = provider.mint("pypi").await.unwrap();
        assert_eq!(token.environment, "pypi");
        assert_eq!(token.reveal(), "oidc-token");
    }

    #[tokio::test]
    async fn test_static_provider_unknown_environment() {
        let provider = StaticTokenProvider::new();
        let err = provider.mint("pypi").await.unwrap_err();
        assert!(matches!(err, AdapterError::AuthFailure { .. }));
    }
}
