//! Release step: attaches distribution and signature bundles to a release
//! on the source-control host.

use super::{ArtifactRef, Step, StepOutput};
use crate::adapters::{ReleaseAdapter, ReleaseRequest};
use crate::context::StepContext;
use crate::errors::ReleaseflowError;
use async_trait::async_trait;
use std::sync::Arc;

/// Creates a release for the trigger's tag and uploads the referenced
/// bundles as assets.
pub struct ReleaseStep {
    id: String,
    adapter: Arc<dyn ReleaseAdapter>,
    repository: String,
    sources: Vec<ArtifactRef>,
}

impl ReleaseStep {
    /// Creates a release step uploading the referenced bundles.
    #[must_use]
    pub fn new(
        adapter: Arc<dyn ReleaseAdapter>,
        repository: impl Into<String>,
        sources: impl IntoIterator<Item = ArtifactRef>,
    ) -> Self {
        Self {
            id: "create-release".to_string(),
            adapter,
            repository: repository.into(),
            sources: sources.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Step for ReleaseStep {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, ctx: &StepContext) -> Result<StepOutput, ReleaseflowError> {
        let mut files = Vec::new();
        for source in &self.sources {
            let bundle = ctx.artifact(&source.stage, &source.name)?;
            files.extend(bundle.files);
        }

        let tag = ctx.trigger().release_tag().to_string();
        let receipt = self
            .adapter
            .create_release(ReleaseRequest {
                repository: self.repository.clone(),
                tag,
                files,
            })
            .await?;

        Ok(StepOutput::empty()
            .with_detail("tag", serde_json::json!(receipt.tag))
            .with_detail("uploaded", serde_json::json!(receipt.uploaded)))
    }
}

impl std::fmt::Debug for ReleaseStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseStep")
            .field("id", &self.id)
            .field("repository", &self.repository)
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}
