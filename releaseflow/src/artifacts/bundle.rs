//! Artifact bundle types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// A single file within an artifact bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    /// The file name relative to the bundle root.
    pub path: String,

    /// Hex-encoded sha256 digest of the file contents.
    pub digest: String,

    /// Size of the file in bytes.
    pub size: u64,
}

impl ArtifactFile {
    /// Creates an artifact file record from in-memory contents.
    #[must_use]
    pub fn from_bytes(path: impl Into<String>, contents: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(contents);

        Self {
            path: path.into(),
            digest: hex::encode(hasher.finalize()),
            size: contents.len() as u64,
        }
    }

    /// Creates an artifact file record from a precomputed digest.
    #[must_use]
    pub fn new(path: impl Into<String>, digest: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            digest: digest.into(),
            size,
        }
    }
}

/// A named bundle of files produced by one stage and consumed by another.
///
/// Bundles are opaque to the coordinator: only the name, producing stage,
/// and file records are tracked. The files themselves live wherever the
/// producing step put them (a shared output directory, typically).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// The bundle name, unique within the producing stage.
    pub name: String,

    /// The stage that produced the bundle.
    pub produced_by: String,

    /// The files in the bundle.
    pub files: Vec<ArtifactFile>,

    /// Additional metadata about the bundle.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,

    /// When the bundle was created (ISO 8601).
    pub created_at: String,
}

impl Artifact {
    /// Creates a new artifact bundle.
    #[must_use]
    pub fn new(name: impl Into<String>, produced_by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            produced_by: produced_by.into(),
            files: Vec::new(),
            metadata: HashMap::new(),
            created_at: crate::utils::iso_timestamp(),
        }
    }

    /// Adds a file record to the bundle.
    #[must_use]
    pub fn with_file(mut self, file: ArtifactFile) -> Self {
        self.files.push(file);
        self
    }

    /// Adds several file records to the bundle.
    #[must_use]
    pub fn with_files(mut self, files: impl IntoIterator<Item = ArtifactFile>) -> Self {
        self.files.extend(files);
        self
    }

    /// Adds metadata to the bundle.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The namespaced store key for this bundle: `"<stage>/<name>"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.produced_by, self.name)
    }

    /// Returns the number of files in the bundle.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_file_from_bytes() {
        let file = ArtifactFile::from_bytes("pkg.whl", b"wheel contents");

        assert_eq!(file.path, "pkg.whl");
        assert_eq!(file.size, 14);
        assert_eq!(file.digest.len(), 64);
    }

    #[test]
    fn test_identical_contents_identical_digest() {
        let a = ArtifactFile::from_bytes("a", b"same");
        let b = ArtifactFile::from_bytes("b", b"same");
        assert_eq!(a.digest, b.digest);

        let c = ArtifactFile::from_bytes("c", b"different");
        assert_ne!(a.digest, c.digest);
    }

    #[test]
    fn test_artifact_key_is_namespaced() {
        let artifact = Artifact::new("dist", "build");
        assert_eq!(artifact.key(), "build/dist");
    }

    #[test]
    fn test_artifact_builder() {
        let artifact = Artifact::new("dist", "build")
            .with_file(ArtifactFile::from_bytes("pkg.tar.gz", b"sdist"))
            .with_file(ArtifactFile::from_bytes("pkg.whl", b"wheel"))
            .with_metadata("version", serde_json::json!("1.2.3"));

        assert_eq!(artifact.file_count(), 2);
        assert_eq!(artifact.metadata.get("version"), Some(&serde_json::json!("1.2.3")));
    }

    #[test]
    fn test_artifact_serialization() {
        let artifact =
            Artifact::new("dist", "build").with_file(ArtifactFile::from_bytes("pkg.whl", b"x"));

        let json = serde_json::to_string(&artifact).unwrap();
        let deserialized: Artifact = serde_json::from_str(&json).unwrap();

        assert_eq!(artifact.name, deserialized.name);
        assert_eq!(artifact.files, deserialized.files);
    }
}
