//! # Releaseflow
//!
//! A release pipeline orchestrator: sequential, gated stages that carry
//! build artifacts from a push event to published, signed, released
//! outputs.
//!
//! Releaseflow provides:
//!
//! - **Stage-based execution**: Discrete stages with dependency edges and
//!   strictly ordered steps
//! - **Artifact hand-off**: Namespaced, run-scoped bundles passed between
//!   stages through an in-run store
//! - **Environment gates**: Manual approval and credential-scoping
//!   checkpoints with bounded waits
//! - **Failure halts the pipeline**: First failure skips everything
//!   downstream; there is no rollback
//! - **Event-driven observability**: Run, stage, step, gate, and artifact
//!   events through pluggable sinks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use releaseflow::prelude::*;
//!
//! let pipeline = PipelineBuilder::new("release")
//!     .stage(StageSpec::new("build", build_steps))
//!     .stage(StageSpec::new("publish", publish_steps)
//!         .depends_on("build")
//!         .with_gate(GateConfig::new(credential_gate)))
//!     .build()?;
//!
//! let report = Coordinator::new(pipeline)
//!     .run(PushEvent::new("main", commit, "v1.2.3"))
//!     .await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod adapters;
pub mod artifacts;
pub mod cancellation;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod gates;
pub mod observability;
pub mod pipeline;
pub mod steps;
pub mod trigger;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapters::{
        BuildAdapter, BuildRequest, PublishAdapter, ReleaseAdapter, SignAdapter,
    };
    pub use crate::artifacts::{Artifact, ArtifactFile, ArtifactStore};
    pub use crate::cancellation::CancellationToken;
    pub use crate::context::{
        RunContext, RunIdentity, ScopedToken, StepContext, TokenProvider,
    };
    pub use crate::core::{RunStatus, StageStatus};
    pub use crate::errors::{
        AdapterError, ArtifactError, CycleDetectedError, PipelineValidationError,
        ReleaseflowError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::executor::StageExecutor;
    pub use crate::gates::{
        CredentialGate, EnvironmentGate, GateConfig, GateGrant, ManualApprovalGate,
    };
    pub use crate::pipeline::{
        ArtifactPolicy, Coordinator, Pipeline, PipelineBuilder, RetryPolicy, RunReport,
        StageReport, StageSpec,
    };
    pub use crate::steps::{ArtifactRef, BuildStep, PublishStep, ReleaseStep, SignStep, Step};
    pub use crate::trigger::PushEvent;
}
