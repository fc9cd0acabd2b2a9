//! External collaborator adapters.
//!
//! Each adapter wraps one external action behind a uniform typed contract:
//! `execute(inputs) -> Result<outputs, AdapterError>`. Calls are at-most-once
//! per run; no adapter retries internally, and the first error is surfaced
//! verbatim.

mod memory;
mod types;

pub use memory::{InMemoryForge, InMemoryIndex, KeylessSigner, LocalBuilder};
pub use types::{
    BuildOutput, BuildRequest, PublishReceipt, PublishRequest, ReleaseReceipt, ReleaseRequest,
    SignRequest, Signature, SignatureBundle,
};

use crate::errors::AdapterError;
use async_trait::async_trait;

/// Invokes the packaging toolchain on a source tree.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BuildAdapter: Send + Sync {
    /// Builds binary and source distributions into a shared output
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::BuildFailure` on any toolchain error.
    async fn build(&self, request: BuildRequest) -> Result<BuildOutput, AdapterError>;
}

/// Uploads built distributions to a package index.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PublishAdapter: Send + Sync {
    /// Uploads the given files to the destination index.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailure`, `UploadConflict`, or `NetworkFailure`; none
    /// are retried here.
    async fn publish(&self, request: PublishRequest) -> Result<PublishReceipt, AdapterError>;
}

/// Produces detached signatures bound to a transparency log.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignAdapter: Send + Sync {
    /// Signs the given files.
    ///
    /// # Errors
    ///
    /// Returns `AuthFailure` if the signing identity cannot be established.
    async fn sign(&self, request: SignRequest) -> Result<SignatureBundle, AdapterError>;
}

/// Creates releases on the source-control host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseAdapter: Send + Sync {
    /// Creates (or appends to) the named release and uploads the files.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceNotFound` if the tag does not exist, or
    /// `UploadConflict` if an asset upload is rejected.
    async fn create_release(&self, request: ReleaseRequest)
        -> Result<ReleaseReceipt, AdapterError>;
}
