//! Sign step: produces detached signatures for a dependency's files and
//! publishes them as a bundle of their own.

use super::{ArtifactRef, Step, StepOutput};
use crate::adapters::{SignAdapter, SignRequest};
use crate::artifacts::Artifact;
use crate::context::StepContext;
use crate::errors::ReleaseflowError;
use async_trait::async_trait;
use std::sync::Arc;

/// Signs selected files from a dependency bundle.
pub struct SignStep {
    id: String,
    adapter: Arc<dyn SignAdapter>,
    source: ArtifactRef,
    suffixes: Vec<String>,
    artifact_name: String,
}

impl SignStep {
    /// Creates a sign step covering `.tar.gz` and `.whl` files by default,
    /// publishing the signatures as the `signatures` bundle.
    #[must_use]
    pub fn new(adapter: Arc<dyn SignAdapter>, source: ArtifactRef) -> Self {
        Self {
            id: "sign-distributions".to_string(),
            adapter,
            source,
            suffixes: vec![".tar.gz".to_string(), ".whl".to_string()],
            artifact_name: "signatures".to_string(),
        }
    }

    /// Replaces the file suffixes selected for signing.
    #[must_use]
    pub fn with_suffixes(mut self, suffixes: impl IntoIterator<Item = String>) -> Self {
        self.suffixes = suffixes.into_iter().collect();
        self
    }
}

#[async_trait]
impl Step for SignStep {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, ctx: &StepContext) -> Result<StepOutput, ReleaseflowError> {
        let bundle = ctx.artifact(&self.source.stage, &self.source.name)?;

        let files: Vec<_> = bundle
            .files
            .into_iter()
            .filter(|file| self.suffixes.iter().any(|s| file.path.ends_with(s)))
            .collect();

        if files.is_empty() {
            return Err(ReleaseflowError::Internal(format!(
                "no files in '{}/{}' matched the signing suffixes",
                self.source.stage, self.source.name
            )));
        }

        let signed = self.adapter.sign(SignRequest { files }).await?;

        let log_indexes: Vec<_> = signed.signatures.iter().map(|s| s.log_index).collect();
        let artifact = Artifact::new(&self.artifact_name, ctx.stage_name())
            .with_metadata("log_indexes", serde_json::json!(log_indexes))
            .with_files(signed.files());

        Ok(StepOutput::empty()
            .with_artifact(artifact)
            .with_detail("signed", serde_json::json!(log_indexes.len())))
    }
}

impl std::fmt::Debug for SignStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignStep")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("suffixes", &self.suffixes)
            .finish_non_exhaustive()
    }
}
