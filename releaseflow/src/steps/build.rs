//! Build step: invokes the packaging toolchain and publishes the
//! distributions as an artifact bundle.

use super::{Step, StepOutput};
use crate::adapters::{BuildAdapter, BuildRequest};
use crate::artifacts::Artifact;
use crate::context::StepContext;
use crate::errors::ReleaseflowError;
use async_trait::async_trait;
use std::sync::Arc;

/// Builds source and binary distributions from a source tree.
pub struct BuildStep {
    id: String,
    adapter: Arc<dyn BuildAdapter>,
    request: BuildRequest,
    artifact_name: String,
}

impl BuildStep {
    /// Creates a build step that publishes its output as the `dist` bundle.
    #[must_use]
    pub fn new(adapter: Arc<dyn BuildAdapter>, request: BuildRequest) -> Self {
        Self {
            id: "build-distributions".to_string(),
            adapter,
            request,
            artifact_name: "dist".to_string(),
        }
    }

    /// Overrides the published bundle name.
    #[must_use]
    pub fn with_artifact_name(mut self, name: impl Into<String>) -> Self {
        self.artifact_name = name.into();
        self
    }
}

#[async_trait]
impl Step for BuildStep {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, ctx: &StepContext) -> Result<StepOutput, ReleaseflowError> {
        let output = self.adapter.build(self.request.clone()).await?;

        let file_count = output.files.len();
        let artifact = Artifact::new(&self.artifact_name, ctx.stage_name())
            .with_metadata("version", serde_json::json!(self.request.version))
            .with_metadata("output_dir", serde_json::json!(output.output_dir))
            .with_files(output.files);

        Ok(StepOutput::empty()
            .with_artifact(artifact)
            .with_detail("files", serde_json::json!(file_count)))
    }
}

impl std::fmt::Debug for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildStep")
            .field("id", &self.id)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}
