//! Event sink system for observability.
//!
//! The coordinator and executor emit lifecycle events (`run.started`,
//! `stage.failed`, `gate.timeout`, ...) through a sink owned by the run
//! context. Sinks are injected per run, never process globals.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
