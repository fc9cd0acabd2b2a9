//! Manual approval gate.

use super::{EnvironmentGate, GateGrant};
use crate::errors::AdapterError;
use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Notify;

/// A gate satisfied by an explicit approval from an operator.
///
/// `approve` may be called from any task; waiters wake cooperatively.
#[derive(Debug, Default)]
pub struct ManualApprovalGate {
    approved_by: RwLock<Option<String>>,
    notify: Notify,
}

impl ManualApprovalGate {
    /// Creates a new unapproved gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants the approval. Idempotent; the first approver is kept.
    pub fn approve(&self, approver: impl Into<String>) {
        {
            let mut approved = self.approved_by.write();
            if approved.is_none() {
                *approved = Some(approver.into());
            }
        }
        self.notify.notify_waiters();
    }

    /// Returns who approved, if anyone.
    #[must_use]
    pub fn approver(&self) -> Option<String> {
        self.approved_by.read().clone()
    }
}

#[async_trait]
impl EnvironmentGate for ManualApprovalGate {
    fn describe(&self) -> String {
        "manual-approval".to_string()
    }

    async fn wait_ready(&self) -> Result<GateGrant, AdapterError> {
        loop {
            // Register interest before checking, so an approval between the
            // check and the await is not lost.
            let notified = self.notify.notified();

            if let Some(by) = self.approved_by.read().clone() {
                return Ok(GateGrant::approved(by));
            }

            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_already_approved_gate_is_ready() {
        let gate = ManualApprovalGate::new();
        gate.approve("release-manager");

        let grant = gate.wait_ready().await.unwrap();
        assert_eq!(grant.approved_by.as_deref(), Some("release-manager"));
    }

    #[tokio::test]
    async fn test_wait_wakes_on_approval() {
        let gate = Arc::new(ManualApprovalGate::new());

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_ready().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.approve("ops");

        let grant = waiter.await.unwrap().unwrap();
        assert_eq!(grant.approved_by.as_deref(), Some("ops"));
    }

    #[tokio::test]
    async fn test_first_approver_wins() {
        let gate = ManualApprovalGate::new();
        gate.approve("first");
        gate.approve("second");

        assert_eq!(gate.approver().as_deref(), Some("first"));
    }
}
