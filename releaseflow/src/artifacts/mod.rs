//! Artifact bundles and the per-run artifact store.
//!
//! Artifacts are the hand-off boundary between stages: a producing stage
//! uploads a named bundle, a consuming stage downloads it by name.

mod bundle;
mod store;

pub use bundle::{Artifact, ArtifactFile};
pub use store::ArtifactStore;
