//! In-memory adapter implementations.
//!
//! These back the default pipeline wiring in tests and local runs. Each one
//! models the failure surface of its real counterpart (duplicate uploads,
//! missing references, unreachable hosts) without any network access.

use super::{
    BuildAdapter, BuildOutput, BuildRequest, PublishAdapter, PublishReceipt, PublishRequest,
    ReleaseAdapter, ReleaseReceipt, ReleaseRequest, SignAdapter, SignRequest, Signature,
    SignatureBundle,
};
use crate::artifacts::ArtifactFile;
use crate::errors::AdapterError;
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A builder that synthesizes source and binary distributions in memory.
#[derive(Debug, Default)]
pub struct LocalBuilder {
    fail_with: RwLock<Option<String>>,
}

impl LocalBuilder {
    /// Creates a builder that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent build fail with the given message.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fail_with.write() = Some(message.into());
    }
}

#[async_trait]
impl BuildAdapter for LocalBuilder {
    async fn build(&self, request: BuildRequest) -> Result<BuildOutput, AdapterError> {
        if let Some(message) = self.fail_with.read().clone() {
            return Err(AdapterError::build_failure(message));
        }

        let output_dir = format!("{}/dist", request.source_dir);
        let sdist = format!("{}-{}.tar.gz", request.package, request.version);
        let wheel = format!("{}-{}-py3-none-any.whl", request.package, request.version);

        let files = vec![
            ArtifactFile::from_bytes(&sdist, format!("sdist of {sdist}").as_bytes()),
            ArtifactFile::from_bytes(&wheel, format!("wheel of {wheel}").as_bytes()),
        ];

        Ok(BuildOutput { output_dir, files })
    }
}

/// A package index that tracks uploads by file name.
///
/// Re-uploading a file name that the index has already accepted is rejected
/// with an `UploadConflict`, matching how real indexes treat duplicate
/// version uploads.
#[derive(Debug)]
pub struct InMemoryIndex {
    url: String,
    accepted: RwLock<HashMap<String, String>>,
    unreachable: AtomicBool,
}

impl InMemoryIndex {
    /// Creates an empty index at the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            accepted: RwLock::new(HashMap::new()),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Makes the index unreachable (or reachable again).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Whether the index has accepted a file with the given name.
    #[must_use]
    pub fn contains(&self, file_name: &str) -> bool {
        self.accepted.read().contains_key(file_name)
    }

    /// Number of files the index has accepted.
    #[must_use]
    pub fn published_count(&self) -> usize {
        self.accepted.read().len()
    }
}

#[async_trait]
impl PublishAdapter for InMemoryIndex {
    async fn publish(&self, request: PublishRequest) -> Result<PublishReceipt, AdapterError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(AdapterError::network_failure(format!(
                "index '{}' is unreachable",
                self.url
            )));
        }

        if request.token.is_expired() {
            return Err(AdapterError::auth_failure(format!(
                "credential for environment '{}' has expired",
                request.token.environment
            )));
        }

        // Reject the whole upload before accepting anything, so a conflict
        // leaves the index unchanged.
        {
            let accepted = self.accepted.read();
            for file in &request.files {
                if accepted.contains_key(&file.path) {
                    return Err(AdapterError::upload_conflict(
                        self.url.clone(),
                        format!("file '{}' already exists on the index", file.path),
                    ));
                }
            }
        }

        let mut accepted = self.accepted.write();
        let mut published = Vec::with_capacity(request.files.len());
        for file in request.files {
            accepted.insert(file.path.clone(), file.digest);
            published.push(file.path);
        }

        Ok(PublishReceipt {
            index_url: self.url.clone(),
            published,
        })
    }
}

/// A signer that derives deterministic signatures from file digests.
///
/// Each signature is appended to an in-memory transparency log; the returned
/// log index is the position of that entry.
#[derive(Debug)]
pub struct KeylessSigner {
    identity: RwLock<Option<String>>,
    next_log_index: AtomicU64,
    log: RwLock<Vec<String>>,
}

impl KeylessSigner {
    /// Creates a signer with the given ambient identity.
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: RwLock::new(Some(identity.into())),
            next_log_index: AtomicU64::new(0),
            log: RwLock::new(Vec::new()),
        }
    }

    /// Creates a signer with no ambient identity. All signing attempts fail.
    #[must_use]
    pub fn without_identity() -> Self {
        Self {
            identity: RwLock::new(None),
            next_log_index: AtomicU64::new(0),
            log: RwLock::new(Vec::new()),
        }
    }

    /// Number of entries in the transparency log.
    #[must_use]
    pub fn log_len(&self) -> usize {
        self.log.read().len()
    }
}

#[async_trait]
impl SignAdapter for KeylessSigner {
    async fn sign(&self, request: SignRequest) -> Result<SignatureBundle, AdapterError> {
        let identity = self.identity.read().clone().ok_or_else(|| {
            AdapterError::auth_failure("signing identity cannot be established")
        })?;

        let mut signatures = Vec::with_capacity(request.files.len());
        for file in request.files {
            let mut hasher = Sha256::new();
            hasher.update(identity.as_bytes());
            hasher.update(file.digest.as_bytes());
            let payload = hex::encode(hasher.finalize());

            let log_index = self.next_log_index.fetch_add(1, Ordering::SeqCst);
            self.log.write().push(payload.clone());

            signatures.push(Signature {
                subject: file.path.clone(),
                bundle: ArtifactFile::from_bytes(
                    format!("{}.sigstore", file.path),
                    payload.as_bytes(),
                ),
                log_index,
            });
        }

        Ok(SignatureBundle { signatures })
    }
}

/// A source-control host holding git references and releases.
#[derive(Debug, Default)]
pub struct InMemoryForge {
    refs: RwLock<HashSet<String>>,
    releases: RwLock<HashMap<String, Vec<ArtifactFile>>>,
}

impl InMemoryForge {
    /// Creates an empty forge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a git reference, making releases against it possible.
    pub fn push_ref(&self, reference: impl Into<String>) {
        self.refs.write().insert(reference.into());
    }

    /// The asset file names attached to the named release, if it exists.
    #[must_use]
    pub fn release_assets(&self, tag: &str) -> Option<Vec<String>> {
        self.releases
            .read()
            .get(tag)
            .map(|files| files.iter().map(|f| f.path.clone()).collect())
    }

    /// Whether a release exists for the tag.
    #[must_use]
    pub fn has_release(&self, tag: &str) -> bool {
        self.releases.read().contains_key(tag)
    }
}

#[async_trait]
impl ReleaseAdapter for InMemoryForge {
    async fn create_release(
        &self,
        request: ReleaseRequest,
    ) -> Result<ReleaseReceipt, AdapterError> {
        let reference = format!("refs/tags/{}", request.tag);
        if !self.refs.read().contains(&reference) {
            return Err(AdapterError::reference_not_found(reference));
        }

        let mut releases = self.releases.write();

        // Duplicate asset names, against attached assets or within the
        // request itself, are rejected before anything is appended.
        let attached = releases.get(&request.tag);
        for (idx, file) in request.files.iter().enumerate() {
            let duplicate = attached
                .is_some_and(|assets| assets.iter().any(|existing| existing.path == file.path))
                || request.files[..idx]
                    .iter()
                    .any(|earlier| earlier.path == file.path);
            if duplicate {
                return Err(AdapterError::upload_conflict(
                    format!("{}@{}", request.repository, request.tag),
                    format!("asset '{}' already attached to the release", file.path),
                ));
            }
        }

        let assets = releases.entry(request.tag.clone()).or_default();
        let mut uploaded = Vec::with_capacity(request.files.len());
        for file in request.files {
            uploaded.push(file.path.clone());
            assets.push(file);
        }

        Ok(ReleaseReceipt {
            repository: request.repository,
            tag: request.tag,
            uploaded,
        })
    }
}
