//! Steps: the units of work a stage is made of.
//!
//! A step performs one action, typically a single adapter call, and may
//! publish artifact bundles for later stages. Steps within a stage run
//! strictly in declaration order; the executor stops the stage at the first
//! failing step.

mod build;
mod publish;
mod release;
mod sign;

pub use build::BuildStep;
pub use publish::PublishStep;
pub use release::ReleaseStep;
pub use sign::SignStep;

use crate::artifacts::Artifact;
use crate::context::StepContext;
use crate::errors::ReleaseflowError;
use async_trait::async_trait;
use std::collections::HashMap;

/// One unit of work inside a stage.
#[async_trait]
pub trait Step: Send + Sync {
    /// A stable identifier for reports and events, unique within the stage.
    fn id(&self) -> &str;

    /// Runs the step.
    ///
    /// # Errors
    ///
    /// Any error fails the step; the executor aborts the remaining steps of
    /// the stage.
    async fn run(&self, ctx: &StepContext) -> Result<StepOutput, ReleaseflowError>;
}

/// What a successful step hands back to the executor.
///
/// Artifacts listed here are committed to the run's store after the step
/// returns; a failing step commits nothing.
#[derive(Debug, Default)]
pub struct StepOutput {
    /// Artifact bundles produced by the step.
    pub artifacts: Vec<Artifact>,

    /// Free-form detail recorded in events.
    pub detail: HashMap<String, serde_json::Value>,
}

impl StepOutput {
    /// An output with no artifacts or detail.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds an artifact bundle to the output.
    #[must_use]
    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    /// Adds a detail entry to the output.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.detail.insert(key.into(), value);
        self
    }
}

/// Names an artifact bundle by producing stage and bundle name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// The stage that produced the bundle.
    pub stage: String,
    /// The bundle name.
    pub name: String,
}

impl ArtifactRef {
    /// Creates a reference to `<stage>/<name>`.
    pub fn new(stage: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_output_builder() {
        let output = StepOutput::empty()
            .with_artifact(Artifact::new("dist", "build"))
            .with_detail("count", serde_json::json!(2));

        assert_eq!(output.artifacts.len(), 1);
        assert_eq!(output.detail.get("count"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_artifact_ref() {
        let reference = ArtifactRef::new("build", "dist");
        assert_eq!(reference.stage, "build");
        assert_eq!(reference.name, "dist");
    }
}
