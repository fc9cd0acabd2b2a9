//! Run and stage reports.

use crate::artifacts::Artifact;
use crate::core::{RunStatus, StageStatus};
use crate::trigger::PushEvent;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// The outcome of one stage within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    /// The stage name.
    pub name: String,

    /// The terminal status of the stage.
    pub status: StageStatus,

    /// The step that failed, if the stage failed inside a step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,

    /// The error message, if the stage failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// A stable error kind for the failure, if the stage failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    /// Why the stage was skipped, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,

    /// Namespaced keys of the artifact bundles the stage committed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produced: Vec<String>,

    /// Wall-clock stage duration in milliseconds.
    pub duration_ms: u64,
}

impl StageReport {
    /// A report for a stage that ran to completion.
    #[must_use]
    pub fn succeeded(name: impl Into<String>, produced: Vec<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: StageStatus::Succeeded,
            failed_step: None,
            error: None,
            error_kind: None,
            skip_reason: None,
            produced,
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// A report for a stage that never ran.
    #[must_use]
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StageStatus::Skipped,
            failed_step: None,
            error: None,
            error_kind: None,
            skip_reason: Some(reason.into()),
            produced: Vec::new(),
            duration_ms: 0,
        }
    }

    /// A report for a stage that failed outside any step, such as a gate
    /// timeout.
    #[must_use]
    pub fn failed(name: impl Into<String>, error: impl Into<String>, kind: &str) -> Self {
        Self {
            name: name.into(),
            status: StageStatus::Failed,
            failed_step: None,
            error: Some(error.into()),
            error_kind: Some(kind.to_string()),
            skip_reason: None,
            produced: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Whether the failure is worth retrying. Only transport-level
    /// failures qualify.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.status == StageStatus::Failed && self.error_kind.as_deref() == Some("network_failure")
    }
}

/// The outcome of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// The run identifier.
    pub run_id: Uuid,

    /// The pipeline that ran.
    pub pipeline: String,

    /// The push event that triggered the run.
    pub trigger: PushEvent,

    /// The terminal status of the run.
    pub status: RunStatus,

    /// Why the run was cancelled, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,

    /// Per-stage reports in execution order.
    pub stages: Vec<StageReport>,

    /// All artifact bundles the run committed, retained here for
    /// inspection after the store is torn down.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,

    /// Wall-clock run duration in milliseconds.
    pub duration_ms: u64,
}

impl RunReport {
    /// Looks up a stage report by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Whether the run succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
