//! Core status types shared across the orchestrator.

mod status;

pub use status::{RunStatus, StageStatus};
