//! Request and response types for the collaborator adapters.

use crate::artifacts::ArtifactFile;
use crate::context::ScopedToken;
use serde::{Deserialize, Serialize};

/// Inputs for a package build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Root of the source tree to build.
    pub source_dir: String,
    /// Package name, used to derive distribution file names.
    pub package: String,
    /// Version string baked into the distributions.
    pub version: String,
}

impl BuildRequest {
    /// Creates a build request for the given source tree.
    pub fn new(
        source_dir: impl Into<String>,
        package: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            package: package.into(),
            version: version.into(),
        }
    }
}

/// Result of a successful build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildOutput {
    /// Directory the distributions were written to.
    pub output_dir: String,
    /// The built distribution files.
    pub files: Vec<ArtifactFile>,
}

/// Inputs for a publish upload.
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Index the files are uploaded to.
    pub index_url: String,
    /// Distribution files to upload.
    pub files: Vec<ArtifactFile>,
    /// Run-scoped credential minted for this upload.
    pub token: ScopedToken,
}

/// Receipt for a completed publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Index the files were uploaded to.
    pub index_url: String,
    /// Names of the files accepted by the index.
    pub published: Vec<String>,
}

/// Inputs for a signing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignRequest {
    /// Files to produce detached signatures for.
    pub files: Vec<ArtifactFile>,
}

/// A detached signature for one subject file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    /// Path of the file the signature covers.
    pub subject: String,
    /// The signature file itself.
    pub bundle: ArtifactFile,
    /// Index of the corresponding transparency log entry.
    pub log_index: u64,
}

/// Result of a successful signing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureBundle {
    /// One signature per subject file, in input order.
    pub signatures: Vec<Signature>,
}

impl SignatureBundle {
    /// Signature files only, for hand-off to later stages.
    #[must_use]
    pub fn files(&self) -> Vec<ArtifactFile> {
        self.signatures.iter().map(|s| s.bundle.clone()).collect()
    }
}

/// Inputs for release creation on the source-control host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRequest {
    /// Repository the release belongs to, as `owner/name`.
    pub repository: String,
    /// Tag the release is created for. Must already exist on the host.
    pub tag: String,
    /// Files attached to the release.
    pub files: Vec<ArtifactFile>,
}

/// Receipt for a completed release creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseReceipt {
    /// Repository the release was created in.
    pub repository: String,
    /// Tag the release is attached to.
    pub tag: String,
    /// Names of the files uploaded as release assets.
    pub uploaded: Vec<String>,
}
