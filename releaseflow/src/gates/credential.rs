//! Credential-scoped environment gate.

use super::{EnvironmentGate, GateGrant};
use crate::context::TokenProvider;
use crate::errors::AdapterError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A gate satisfied once a scoped credential can be minted for a named
/// deployment environment.
///
/// Minting failures are treated as "not yet available" and retried after a
/// pause until the coordinator's wait bound expires. The minted token is
/// scoped to this one stage invocation and never cached across runs.
pub struct CredentialGate {
    environment: String,
    provider: Arc<dyn TokenProvider>,
    poll_interval: Duration,
}

impl CredentialGate {
    /// Creates a gate for the given environment.
    #[must_use]
    pub fn new(environment: impl Into<String>, provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            environment: environment.into(),
            provider,
            poll_interval: Duration::from_millis(250),
        }
    }

    /// Sets the pause between mint attempts.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns the environment name.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }
}

impl std::fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGate")
            .field("environment", &self.environment)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

#[async_trait]
impl EnvironmentGate for CredentialGate {
    fn describe(&self) -> String {
        format!("environment:{}", self.environment)
    }

    async fn wait_ready(&self) -> Result<GateGrant, AdapterError> {
        loop {
            match self.provider.mint(&self.environment).await {
                Ok(token) => return Ok(GateGrant::with_token(token)),
                Err(err) => {
                    debug!(
                        environment = %self.environment,
                        error = %err,
                        "Credential not yet available"
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}
