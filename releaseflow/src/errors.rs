//! Error types for the releaseflow orchestrator.
//!
//! The adapter taxonomy mirrors the failure modes of the external
//! collaborators (build toolchain, package index, signing service, release
//! host). Validation errors cover pipeline construction faults.

use thiserror::Error;

/// The main error type for releaseflow operations.
#[derive(Debug, Error)]
pub enum ReleaseflowError {
    /// A pipeline validation error occurred.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// An external collaborator call failed.
    #[error("{0}")]
    Adapter(#[from] AdapterError),

    /// An artifact store operation failed.
    #[error("{0}")]
    Artifact(#[from] ArtifactError),

    /// The run was cancelled.
    #[error("Run cancelled: {0}")]
    Cancelled(String),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures surfaced by external collaborator adapters.
///
/// Every variant carries the raw error detail from the collaborator; the
/// coordinator surfaces it verbatim in the run report. Only
/// [`AdapterError::NetworkFailure`] is retryable.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The packaging toolchain failed.
    #[error("Build failure: {message}")]
    BuildFailure {
        /// Raw toolchain error output.
        message: String,
    },

    /// The credential or identity was rejected.
    #[error("Authentication failure: {message}")]
    AuthFailure {
        /// Raw rejection detail.
        message: String,
    },

    /// The artifact or version already exists at the destination.
    #[error("Upload conflict at '{destination}': {message}")]
    UploadConflict {
        /// The destination that rejected the upload.
        destination: String,
        /// Raw rejection detail.
        message: String,
    },

    /// A transient network I/O failure.
    #[error("Network failure: {message}")]
    NetworkFailure {
        /// Raw I/O error detail.
        message: String,
    },

    /// An environment gate wait exceeded its configured bound.
    #[error("Gate timeout for stage '{stage}' after {waited_ms}ms")]
    GateTimeout {
        /// The gated stage.
        stage: String,
        /// How long the run waited before giving up.
        waited_ms: u64,
    },

    /// The release target reference does not exist.
    #[error("Reference not found: {reference}")]
    ReferenceNotFound {
        /// The missing tag or ref name.
        reference: String,
    },
}

impl AdapterError {
    /// Creates a build failure.
    #[must_use]
    pub fn build_failure(message: impl Into<String>) -> Self {
        Self::BuildFailure {
            message: message.into(),
        }
    }

    /// Creates an authentication failure.
    #[must_use]
    pub fn auth_failure(message: impl Into<String>) -> Self {
        Self::AuthFailure {
            message: message.into(),
        }
    }

    /// Creates an upload conflict.
    #[must_use]
    pub fn upload_conflict(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UploadConflict {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Creates a network failure.
    #[must_use]
    pub fn network_failure(message: impl Into<String>) -> Self {
        Self::NetworkFailure {
            message: message.into(),
        }
    }

    /// Creates a gate timeout.
    #[must_use]
    pub fn gate_timeout(stage: impl Into<String>, waited_ms: u64) -> Self {
        Self::GateTimeout {
            stage: stage.into(),
            waited_ms,
        }
    }

    /// Creates a reference-not-found failure.
    #[must_use]
    pub fn reference_not_found(reference: impl Into<String>) -> Self {
        Self::ReferenceNotFound {
            reference: reference.into(),
        }
    }

    /// Returns true if the failure may be retried.
    ///
    /// Only transient network failures qualify. Upload conflicts and
    /// authentication failures must never be retried: the side effect may
    /// already have been applied.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkFailure { .. })
    }

    /// Returns the taxonomy name for reports and events.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BuildFailure { .. } => "build_failure",
            Self::AuthFailure { .. } => "auth_failure",
            Self::UploadConflict { .. } => "upload_conflict",
            Self::NetworkFailure { .. } => "network_failure",
            Self::GateTimeout { .. } => "gate_timeout",
            Self::ReferenceNotFound { .. } => "reference_not_found",
        }
    }
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// Error raised when a cycle is detected in the pipeline graph.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in pipeline: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of stages forming the cycle.
    pub cycle_path: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

impl From<CycleDetectedError> for PipelineValidationError {
    fn from(err: CycleDetectedError) -> Self {
        PipelineValidationError {
            message: err.to_string(),
            stages: err.cycle_path,
        }
    }
}

/// Errors raised by the artifact store.
#[derive(Debug, Clone, Error)]
pub enum ArtifactError {
    /// An artifact with the same namespaced name already exists.
    #[error("Artifact conflict: '{key}' already exists in this run")]
    Conflict {
        /// The conflicting namespaced key.
        key: String,
    },

    /// A requested artifact was not found.
    #[error("Artifact not found: '{key}'")]
    NotFound {
        /// The missing namespaced key.
        key: String,
    },
}

impl ArtifactError {
    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(key: impl Into<String>) -> Self {
        Self::Conflict { key: key.into() }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_failure_is_retryable() {
        assert!(AdapterError::network_failure("reset by peer").is_retryable());
        assert!(!AdapterError::auth_failure("rejected").is_retryable());
        assert!(!AdapterError::upload_conflict("pypi", "version exists").is_retryable());
        assert!(!AdapterError::build_failure("exit 1").is_retryable());
        assert!(!AdapterError::gate_timeout("publish", 5000).is_retryable());
        assert!(!AdapterError::reference_not_found("v1.0.0").is_retryable());
    }

    #[test]
    fn test_adapter_error_kind() {
        assert_eq!(AdapterError::build_failure("x").kind(), "build_failure");
        assert_eq!(
            AdapterError::upload_conflict("idx", "dup").kind(),
            "upload_conflict"
        );
    }

    #[test]
    fn test_upload_conflict_message_surfaced_verbatim() {
        let err = AdapterError::upload_conflict("https://index.example", "400: File already exists");
        assert!(err.to_string().contains("400: File already exists"));
    }

    #[test]
    fn test_cycle_error_into_validation() {
        let err = CycleDetectedError::new(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);
        assert!(err.to_string().contains("a -> b -> a"));

        let validation: PipelineValidationError = err.into();
        assert_eq!(validation.stages.len(), 3);
    }

    #[test]
    fn test_validation_error_with_stages() {
        let err = PipelineValidationError::new("bad pipeline")
            .with_stages(vec!["build".to_string()]);
        assert_eq!(err.stages, vec!["build".to_string()]);
    }
}
