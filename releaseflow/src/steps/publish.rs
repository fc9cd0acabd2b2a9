//! Publish step: uploads a dependency's distributions to a package index
//! using the credential minted by the stage's gate.

use super::{ArtifactRef, Step, StepOutput};
use crate::adapters::{PublishAdapter, PublishRequest};
use crate::context::{ScopedToken, StepContext};
use crate::errors::{AdapterError, ReleaseflowError};
use async_trait::async_trait;
use std::sync::Arc;

/// Uploads built distributions to a package index.
///
/// The credential comes from the stage's gate grant; the step never reads
/// tokens from ambient process state.
pub struct PublishStep {
    id: String,
    adapter: Arc<dyn PublishAdapter>,
    index_url: String,
    source: ArtifactRef,
}

impl PublishStep {
    /// Creates a publish step uploading the referenced bundle.
    #[must_use]
    pub fn new(
        adapter: Arc<dyn PublishAdapter>,
        index_url: impl Into<String>,
        source: ArtifactRef,
    ) -> Self {
        Self {
            id: "upload-to-index".to_string(),
            adapter,
            index_url: index_url.into(),
            source,
        }
    }

    fn scoped_token(ctx: &StepContext) -> Result<ScopedToken, AdapterError> {
        ctx.grant()
            .and_then(|grant| grant.token.clone())
            .ok_or_else(|| {
                AdapterError::auth_failure("no run-scoped credential granted for this stage")
            })
    }
}

#[async_trait]
impl Step for PublishStep {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, ctx: &StepContext) -> Result<StepOutput, ReleaseflowError> {
        let token = Self::scoped_token(ctx)?;
        let bundle = ctx.artifact(&self.source.stage, &self.source.name)?;

        let receipt = self
            .adapter
            .publish(PublishRequest {
                index_url: self.index_url.clone(),
                files: bundle.files,
                token,
            })
            .await?;

        Ok(StepOutput::empty()
            .with_detail("index_url", serde_json::json!(receipt.index_url))
            .with_detail("published", serde_json::json!(receipt.published)))
    }
}

impl std::fmt::Debug for PublishStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishStep")
            .field("id", &self.id)
            .field("index_url", &self.index_url)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryIndex;
    use crate::artifacts::{Artifact, ArtifactFile};
    use crate::context::RunContext;
    use crate::gates::GateGrant;
    use crate::trigger::PushEvent;
    use std::collections::HashSet;

    fn run_with_dist() -> Arc<RunContext> {
        let run = Arc::new(RunContext::new(PushEvent::new("main", "abc123", "v1.0.0")));
        run.store()
            .put(
                Artifact::new("dist", "build")
                    .with_file(ArtifactFile::from_bytes("pkg-1.0.whl", b"wheel")),
            )
            .unwrap();
        run
    }

    #[tokio::test]
    async fn test_publish_step_uploads_dependency_bundle() {
        let index = Arc::new(InMemoryIndex::new("https://index.example/simple"));
        let step = PublishStep::new(
            index.clone(),
            "https://index.example/simple",
            ArtifactRef::new("build", "dist"),
        );

        let grant = GateGrant::with_token(ScopedToken::new("pypi", "tok"));
        let ctx = StepContext::new(
            run_with_dist(),
            "publish",
            HashSet::from(["build".to_string()]),
            Some(grant),
        );

        let output = step.run(&ctx).await.unwrap();
        assert!(index.contains("pkg-1.0.whl"));
        assert_eq!(
            output.detail.get("published"),
            Some(&serde_json::json!(["pkg-1.0.whl"]))
        );
    }

    #[tokio::test]
    async fn test_publish_step_requires_grant_token() {
        let index = Arc::new(InMemoryIndex::new("https://index.example/simple"));
        let step = PublishStep::new(
            index.clone(),
            "https://index.example/simple",
            ArtifactRef::new("build", "dist"),
        );

        let ctx = StepContext::new(
            run_with_dist(),
            "publish",
            HashSet::from(["build".to_string()]),
            None,
        );

        let err = step.run(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("no run-scoped credential"));
        assert_eq!(index.published_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_step_rejects_undeclared_dependency() {
        let index = Arc::new(InMemoryIndex::new("https://index.example/simple"));
        let step = PublishStep::new(
            index,
            "https://index.example/simple",
            ArtifactRef::new("build", "dist"),
        );

        let grant = GateGrant::with_token(ScopedToken::new("pypi", "tok"));
        let ctx = StepContext::new(run_with_dist(), "publish", HashSet::new(), Some(grant));

        let err = step.run(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("without declaring"));
    }
}
