//! Per-run artifact store.

use super::Artifact;
use crate::errors::ArtifactError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// A thread-safe holding area for artifact bundles within a single run.
///
/// Keys are namespaced `"<stage>/<name>"`. Publishing to an existing key is
/// a conflict; bundles never move between runs. The store is dropped at run
/// teardown, which releases every remaining bundle.
#[derive(Debug, Default)]
pub struct ArtifactStore {
    bundles: RwLock<HashMap<String, Artifact>>,
}

impl ArtifactStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads a bundle under its namespaced key.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactError::Conflict` if a bundle with the same key
    /// already exists in this run.
    pub fn put(&self, artifact: Artifact) -> Result<(), ArtifactError> {
        let key = artifact.key();
        let mut bundles = self.bundles.write();

        if bundles.contains_key(&key) {
            return Err(ArtifactError::conflict(key));
        }

        bundles.insert(key, artifact);
        Ok(())
    }

    /// Downloads a bundle by namespaced key.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactError::NotFound` if no bundle exists under the key.
    pub fn get(&self, key: &str) -> Result<Artifact, ArtifactError> {
        self.bundles
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ArtifactError::not_found(key))
    }

    /// Downloads a bundle by producing stage and name.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactError::NotFound` if no bundle exists.
    pub fn get_named(&self, stage: &str, name: &str) -> Result<Artifact, ArtifactError> {
        self.get(&format!("{stage}/{name}"))
    }

    /// Checks whether a bundle exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.bundles.read().contains_key(key)
    }

    /// Removes a single bundle by namespaced key.
    ///
    /// Returns the removed bundle, if it existed. Used by the executor to
    /// back out a failing step's own commits.
    pub fn remove(&self, key: &str) -> Option<Artifact> {
        self.bundles.write().remove(key)
    }

    /// Removes every bundle produced by the given stage.
    ///
    /// Returns the removed bundles. Used when the coordinator's policy
    /// discards a failed stage's output.
    pub fn discard_stage(&self, stage: &str) -> Vec<Artifact> {
        let mut bundles = self.bundles.write();
        let keys: Vec<String> = bundles
            .keys()
            .filter(|k| k.starts_with(&format!("{stage}/")))
            .cloned()
            .collect();

        keys.iter().filter_map(|k| bundles.remove(k)).collect()
    }

    /// Returns a snapshot of every bundle currently held.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Artifact> {
        let mut all: Vec<Artifact> = self.bundles.read().values().cloned().collect();
        all.sort_by(|a, b| a.key().cmp(&b.key()));
        all
    }

    /// Returns all bundle keys.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.bundles.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the number of bundles held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bundles.read().len()
    }

    /// Returns true if the store holds no bundles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bundles.read().is_empty()
    }

    /// Drops every bundle. Called at run teardown.
    pub fn clear(&self) {
        self.bundles.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactFile;

    fn dist_bundle() -> Artifact {
        Artifact::new("dist", "build")
            .with_file(ArtifactFile::from_bytes("pkg.tar.gz", b"sdist"))
            .with_file(ArtifactFile::from_bytes("pkg.whl", b"wheel"))
    }

    #[test]
    fn test_put_and_get() {
        let store = ArtifactStore::new();
        store.put(dist_bundle()).unwrap();

        let fetched = store.get("build/dist").unwrap();
        assert_eq!(fetched.file_count(), 2);

        let named = store.get_named("build", "dist").unwrap();
        assert_eq!(named.name, "dist");
    }

    #[test]
    fn test_put_conflict() {
        let store = ArtifactStore::new();
        store.put(dist_bundle()).unwrap();

        let err = store.put(dist_bundle()).unwrap_err();
        assert!(matches!(err, ArtifactError::Conflict { .. }));
    }

    #[test]
    fn test_get_missing() {
        let store = ArtifactStore::new();
        let err = store.get("build/missing").unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[test]
    fn test_remove_single_bundle() {
        let store = ArtifactStore::new();
        store.put(dist_bundle()).unwrap();

        let removed = store.remove("build/dist").unwrap();
        assert_eq!(removed.name, "dist");
        assert!(store.is_empty());
        assert!(store.remove("build/dist").is_none());
    }

    #[test]
    fn test_discard_stage() {
        let store = ArtifactStore::new();
        store.put(dist_bundle()).unwrap();
        store.put(Artifact::new("signatures", "sign")).unwrap();

        let removed = store.discard_stage("build");
        assert_eq!(removed.len(), 1);
        assert!(!store.contains("build/dist"));
        assert!(store.contains("sign/signatures"));
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let store = ArtifactStore::new();
        store.put(Artifact::new("b", "sign")).unwrap();
        store.put(Artifact::new("a", "build")).unwrap();

        let keys = store.keys();
        assert_eq!(keys, vec!["build/a".to_string(), "sign/b".to_string()]);
    }

    #[test]
    fn test_clear_releases_everything() {
        let store = ArtifactStore::new();
        store.put(dist_bundle()).unwrap();
        assert!(!store.is_empty());

        store.clear();
        assert!(store.is_empty());
    }
}
