//! Context management for run execution.
//!
//! This module provides:
//! - Run identity for correlating events and reports
//! - Run-scoped credentials (never process globals)
//! - Mutable execution contexts for the coordinator and steps

mod credentials;
mod execution;
mod identity;

pub use credentials::{ScopedToken, StaticTokenProvider, TokenProvider};
pub use execution::{RunContext, StepContext};
pub use identity::RunIdentity;
