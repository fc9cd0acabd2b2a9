//! Mutable execution contexts for run and step execution.

use super::RunIdentity;
use crate::artifacts::{Artifact, ArtifactStore};
use crate::cancellation::CancellationToken;
use crate::errors::ReleaseflowError;
use crate::events::{EventSink, NoOpEventSink};
use crate::gates::GateGrant;
use crate::trigger::PushEvent;
use std::collections::HashSet;
use std::sync::Arc;

/// The mutable context for one run.
///
/// Owns the run-private artifact store and the credential grants; both live
/// exactly as long as the run. Nothing here is shared across runs.
pub struct RunContext {
    /// Run identity.
    identity: RunIdentity,
    /// The push event that triggered the run.
    trigger: PushEvent,
    /// The run-private artifact store.
    store: ArtifactStore,
    /// Event sink for emitting lifecycle events.
    event_sink: Arc<dyn EventSink>,
    /// Cooperative cancellation token.
    cancellation: Arc<CancellationToken>,
}

impl RunContext {
    /// Creates a new run context for a trigger.
    #[must_use]
    pub fn new(trigger: PushEvent) -> Self {
        Self {
            identity: RunIdentity::new(),
            trigger,
            store: ArtifactStore::new(),
            event_sink: Arc::new(NoOpEventSink),
            cancellation: Arc::new(CancellationToken::new()),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the run identity.
    #[must_use]
    pub fn identity(&self) -> &RunIdentity {
        &self.identity
    }

    /// Returns the trigger event.
    #[must_use]
    pub fn trigger(&self) -> &PushEvent {
        &self.trigger
    }

    /// Returns the artifact store.
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &Arc<CancellationToken> {
        &self.cancellation
    }

    /// Returns whether the run has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn cancel_reason(&self) -> Option<String> {
        self.cancellation.reason()
    }

    /// Emits an event enriched with run correlation fields.
    pub fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut enriched = data.unwrap_or_else(|| serde_json::json!({}));

        if let serde_json::Value::Object(ref mut map) = enriched {
            map.insert(
                "run_id".to_string(),
                serde_json::json!(self.identity.run_id_str()),
            );
            map.insert("branch".to_string(), serde_json::json!(&self.trigger.branch));
            map.insert(
                "commit".to_string(),
                serde_json::json!(self.trigger.short_commit()),
            );
        }

        self.event_sink.try_emit(event_type, Some(enriched));
    }
}

/// The context for a single step execution within a stage.
pub struct StepContext {
    /// The run context.
    run: Arc<RunContext>,
    /// The stage name.
    stage_name: String,
    /// Declared dependency stages; artifact reads are restricted to these
    /// plus the stage's own namespace.
    dependencies: HashSet<String>,
    /// The grant from a satisfied environment gate, if the stage is gated.
    grant: Option<GateGrant>,
}

impl StepContext {
    /// Creates a new step context.
    #[must_use]
    pub fn new(
        run: Arc<RunContext>,
        stage_name: impl Into<String>,
        dependencies: HashSet<String>,
        grant: Option<GateGrant>,
    ) -> Self {
        Self {
            run,
            stage_name: stage_name.into(),
            dependencies,
            grant,
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    /// Returns the run context.
    #[must_use]
    pub fn run(&self) -> &Arc<RunContext> {
        &self.run
    }

    /// Returns the trigger event.
    #[must_use]
    pub fn trigger(&self) -> &PushEvent {
        self.run.trigger()
    }

    /// Returns the gate grant, if the stage is gated.
    #[must_use]
    pub fn grant(&self) -> Option<&GateGrant> {
        self.grant.as_ref()
    }

    /// Downloads an artifact produced by a dependency stage (or by an
    /// earlier step of this stage).
    ///
    /// # Errors
    ///
    /// Returns an error if the producing stage is not a declared dependency,
    /// or if no such bundle exists.
    pub fn artifact(&self, stage: &str, name: &str) -> Result<Artifact, ReleaseflowError> {
        if stage != self.stage_name && !self.dependencies.contains(stage) {
            return Err(ReleaseflowError::Internal(format!(
                "stage '{}' read artifact '{stage}/{name}' without declaring '{stage}' as a dependency",
                self.stage_name
            )));
        }

        Ok(self.run.store().get_named(stage, name)?)
    }

    /// Emits an event enriched with run and stage fields.
    pub fn try_emit_event(&self, event_type: &str, data: Option<serde_json::Value>) {
        let mut enriched = data.unwrap_or_else(|| serde_json::json!({}));

        if let serde_json::Value::Object(ref mut map) = enriched {
            map.insert("stage".to_string(), serde_json::json!(&self.stage_name));
        }

        self.run.try_emit_event(event_type, Some(enriched));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactFile;
    use crate::events::CollectingEventSink;

    fn push() -> PushEvent {
        PushEvent::new("main", "0123456789abcdef", "v1.0.0")
    }

    #[test]
    fn test_run_context_creation() {
        let ctx = RunContext::new(push());
        assert!(!ctx.is_cancelled());
        assert!(ctx.store().is_empty());
        assert_eq!(ctx.trigger().release_tag(), "v1.0.0");
    }

    #[test]
    fn test_run_context_event_enrichment() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = RunContext::new(push()).with_event_sink(sink.clone());

        ctx.try_emit_event("run.started", None);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        let data = events[0].1.as_ref().unwrap();
        assert_eq!(data["branch"], "main");
        assert_eq!(data["commit"], "0123456789ab");
        assert!(data["run_id"].is_string());
    }

    #[test]
    fn test_step_context_artifact_access_is_strict() {
        let run = Arc::new(RunContext::new(push()));
        run.store()
            .put(
                Artifact::new("dist", "build")
                    .with_file(ArtifactFile::from_bytes("pkg.whl", b"w")),
            )
            .unwrap();

        let declared = StepContext::new(
            run.clone(),
            "publish",
            ["build".to_string()].into_iter().collect(),
            None,
        );
        assert!(declared.artifact("build", "dist").is_ok());

        let undeclared = StepContext::new(run, "publish", HashSet::new(), None);
        assert!(undeclared.artifact("build", "dist").is_err());
    }

    #[test]
    fn test_step_context_reads_own_namespace() {
        let run = Arc::new(RunContext::new(push()));
        run.store().put(Artifact::new("partial", "build")).unwrap();

        let ctx = StepContext::new(run, "build", HashSet::new(), None);
        assert!(ctx.artifact("build", "partial").is_ok());
    }

    #[test]
    fn test_step_context_event_carries_stage() {
        let sink = Arc::new(CollectingEventSink::new());
        let run = Arc::new(RunContext::new(push()).with_event_sink(sink.clone()));
        let ctx = StepContext::new(run, "publish", HashSet::new(), None);

        ctx.try_emit_event("step.started", Some(serde_json::json!({"step": "upload"})));

        let data = sink.events()[0].1.clone().unwrap();
        assert_eq!(data["stage"], "publish");
        assert_eq!(data["step"], "upload");
    }

    #[test]
    fn test_cancellation_flows_through_context() {
        let token = Arc::new(CancellationToken::new());
        let ctx = RunContext::new(push()).with_cancellation(token.clone());

        token.supersede("deadbeef");
        assert!(ctx.is_cancelled());
        assert_eq!(
            ctx.cancel_reason(),
            Some("superseded by push deadbeef".to_string())
        );
    }
}
