//! Environment gates for approval- and credential-scoped stages.
//!
//! A gated stage blocks until its gate is satisfied or the configured
//! timeout elapses, in which case the stage fails with a gate timeout. The
//! wait is cooperative; nothing busy-polls the approval state.

mod approval;
mod credential;

pub use approval::ManualApprovalGate;
pub use credential::CredentialGate;

use crate::context::ScopedToken;
use crate::errors::AdapterError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// What a satisfied gate hands to the stage it guards.
#[derive(Debug, Clone, Default)]
pub struct GateGrant {
    /// The environment the stage runs against, if any.
    pub environment: Option<String>,

    /// The credential minted for the stage invocation, if any.
    pub token: Option<ScopedToken>,

    /// Who approved the stage, for manual gates.
    pub approved_by: Option<String>,
}

impl GateGrant {
    /// A grant with no environment or credential attached.
    #[must_use]
    pub fn open() -> Self {
        Self::default()
    }

    /// A grant carrying a scoped credential.
    #[must_use]
    pub fn with_token(token: ScopedToken) -> Self {
        Self {
            environment: Some(token.environment.clone()),
            token: Some(token),
            approved_by: None,
        }
    }

    /// A grant recording a manual approval.
    #[must_use]
    pub fn approved(by: impl Into<String>) -> Self {
        Self {
            environment: None,
            token: None,
            approved_by: Some(by.into()),
        }
    }
}

/// An approval or credential-scoping checkpoint before a stage may run.
#[async_trait]
pub trait EnvironmentGate: Send + Sync + Debug {
    /// A short description for events and reports.
    fn describe(&self) -> String;

    /// Blocks until the gate is satisfied.
    ///
    /// The coordinator bounds this wait with the configured timeout; the
    /// gate itself waits indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an `AdapterError` if the gate can never be satisfied.
    async fn wait_ready(&self) -> Result<GateGrant, AdapterError>;
}

/// A gate together with its wait bound.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// The gate implementation.
    pub gate: Arc<dyn EnvironmentGate>,

    /// How long the coordinator waits before failing the stage.
    pub timeout: Duration,
}

impl GateConfig {
    /// Creates a gate config with the default 5 minute wait bound.
    #[must_use]
    pub fn new(gate: Arc<dyn EnvironmentGate>) -> Self {
        Self {
            gate,
            timeout: Duration::from_secs(300),
        }
    }

    /// Sets the wait bound.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A gate that is always satisfied. Useful in tests and for ungated
/// environments that still want a named grant.
#[derive(Debug, Clone, Default)]
pub struct OpenGate;

#[async_trait]
impl EnvironmentGate for OpenGate {
    fn describe(&self) -> String {
        "open".to_string()
    }

    async fn wait_ready(&self) -> Result<GateGrant, AdapterError> {
        Ok(GateGrant::open())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_gate_is_immediately_ready() {
        let gate = OpenGate;
        let grant = gate.wait_ready().await.unwrap();

        assert!(grant.environment.is_none());
        assert!(grant.token.is_none());
    }

    #[test]
    fn test_gate_grant_with_token() {
        let grant = GateGrant::with_token(ScopedToken::new("pypi", "tok"));
        assert_eq!(grant.environment.as_deref(), Some("pypi"));
        assert!(grant.token.is_some());
    }

    #[test]
    fn test_gate_config_timeout() {
        let config = GateConfig::new(Arc::new(OpenGate)).with_timeout(Duration::from_millis(50));
        assert_eq!(config.timeout, Duration::from_millis(50));
    }
}
