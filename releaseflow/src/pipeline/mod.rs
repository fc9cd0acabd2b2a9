//! Pipeline definition and coordination.
//!
//! A pipeline is a validated set of stages with dependency edges. The
//! coordinator drives one run of a pipeline: it resolves execution order,
//! waits on environment gates, hands stages to the executor, cascades
//! skips past failures, and assembles the final run report.

mod builder;
mod coordinator;
mod report;
mod retry;
mod spec;


pub use builder::PipelineBuilder;
pub use coordinator::{ArtifactPolicy, Coordinator};
pub use report::{RunReport, StageReport};
pub use retry::RetryPolicy;
pub use spec::{Pipeline, StageSpec};
