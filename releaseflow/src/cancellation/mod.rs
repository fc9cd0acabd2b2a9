//! Cooperative cancellation for in-flight runs.
//!
//! Cancellation is only observed between stages: an in-flight step is
//! allowed to finish rather than being torn down mid-upload, and
//! already-succeeded irreversible steps stand.

mod token;

pub use token::{CancelCallback, CancellationToken};
