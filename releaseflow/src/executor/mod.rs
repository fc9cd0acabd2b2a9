//! Stage execution.
//!
//! The executor runs one stage's steps strictly in order, commits artifact
//! bundles to the run's store as each step succeeds, and aborts the stage at
//! the first failing step. It performs no retries and no dependency or gate
//! handling; both belong to the coordinator.

use crate::context::{RunContext, StepContext};
use crate::core::StageStatus;
use crate::errors::ReleaseflowError;
use crate::gates::GateGrant;
use crate::pipeline::{StageReport, StageSpec};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Runs the steps of a single stage.
#[derive(Debug, Default)]
pub struct StageExecutor;

impl StageExecutor {
    /// Creates a stage executor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the stage against the given run.
    ///
    /// A step's artifacts are committed only after the step returns
    /// successfully; a failing step leaves nothing behind, and the remaining
    /// steps are not started.
    pub async fn execute(
        &self,
        stage: &StageSpec,
        run: &Arc<RunContext>,
        grant: Option<GateGrant>,
    ) -> StageReport {
        let started = Instant::now();
        let ctx = StepContext::new(
            Arc::clone(run),
            stage.name(),
            stage.dependencies().clone(),
            grant,
        );

        info!(stage = %stage.name(), steps = stage.steps().len(), "stage started");
        ctx.try_emit_event("stage.started", None);

        let mut produced = Vec::new();

        for step in stage.steps() {
            debug!(stage = %stage.name(), step = %step.id(), "step started");
            ctx.try_emit_event("step.started", Some(serde_json::json!({ "step": step.id() })));

            match step.run(&ctx).await {
                Ok(output) => {
                    if let Err(err) = Self::commit(&ctx, &output.artifacts, &mut produced) {
                        error!(stage = %stage.name(), step = %step.id(), error = %err, "artifact commit failed");
                        ctx.try_emit_event(
                            "step.failed",
                            Some(serde_json::json!({ "step": step.id(), "error": err.to_string() })),
                        );
                        return Self::failed(stage, step.id(), &err, produced, started, &ctx);
                    }

                    ctx.try_emit_event(
                        "step.succeeded",
                        Some(serde_json::json!({
                            "step": step.id(),
                            "detail": output.detail,
                        })),
                    );
                }
                Err(err) => {
                    error!(stage = %stage.name(), step = %step.id(), error = %err, "step failed");
                    ctx.try_emit_event(
                        "step.failed",
                        Some(serde_json::json!({ "step": step.id(), "error": err.to_string() })),
                    );
                    return Self::failed(stage, step.id(), &err, produced, started, &ctx);
                }
            }
        }

        info!(stage = %stage.name(), "stage succeeded");
        ctx.try_emit_event("stage.succeeded", None);

        StageReport::succeeded(stage.name(), produced, started.elapsed())
    }

    /// Commits a step's bundles atomically with respect to the step: if any
    /// put fails, the bundles this step already stored are backed out, so a
    /// failing step leaves nothing behind.
    fn commit(
        ctx: &StepContext,
        artifacts: &[crate::artifacts::Artifact],
        produced: &mut Vec<String>,
    ) -> Result<(), ReleaseflowError> {
        let mut committed: Vec<String> = Vec::with_capacity(artifacts.len());

        for artifact in artifacts {
            let key = artifact.key();
            if let Err(err) = ctx.run().store().put(artifact.clone()) {
                for key in &committed {
                    ctx.run().store().remove(key);
                }
                return Err(err.into());
            }
            committed.push(key);
        }

        for (artifact, key) in artifacts.iter().zip(committed) {
            ctx.try_emit_event(
                "artifact.published",
                Some(serde_json::json!({
                    "key": key,
                    "files": artifact.file_count(),
                })),
            );
            produced.push(key);
        }
        Ok(())
    }

    fn failed(
        stage: &StageSpec,
        step_id: &str,
        err: &ReleaseflowError,
        produced: Vec<String>,
        started: Instant,
        ctx: &StepContext,
    ) -> StageReport {
        ctx.try_emit_event(
            "stage.failed",
            Some(serde_json::json!({ "step": step_id, "error": err.to_string() })),
        );

        let kind = match err {
            ReleaseflowError::Adapter(adapter) => adapter.kind(),
            _ => "internal",
        };

        StageReport {
            name: stage.name().to_string(),
            status: StageStatus::Failed,
            failed_step: Some(step_id.to_string()),
            error: Some(err.to_string()),
            error_kind: Some(kind.to_string()),
            skip_reason: None,
            produced,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{BuildRequest, LocalBuilder, MockBuildAdapter};
    use crate::artifacts::Artifact;
    use crate::errors::AdapterError;
    use crate::events::CollectingEventSink;
    use crate::steps::{BuildStep, Step, StepOutput};
    use crate::trigger::PushEvent;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    fn run_ctx(sink: Arc<CollectingEventSink>) -> Arc<RunContext> {
        Arc::new(
            RunContext::new(PushEvent::new("main", "abc123", "v1.0.0")).with_event_sink(sink),
        )
    }

    fn build_stage(adapter: Arc<dyn crate::adapters::BuildAdapter>) -> StageSpec {
        StageSpec::new(
            "build",
            vec![Arc::new(BuildStep::new(
                adapter,
                BuildRequest::new("/src/pkg", "pkg", "1.0.0"),
            ))],
        )
    }

    #[tokio::test]
    async fn test_executor_commits_artifacts_on_success() {
        let sink = Arc::new(CollectingEventSink::new());
        let run = run_ctx(sink.clone());
        let stage = build_stage(Arc::new(LocalBuilder::new()));

        let report = StageExecutor::new().execute(&stage, &run, None).await;

        assert_eq!(report.status, StageStatus::Succeeded);
        assert_eq!(report.produced, vec!["build/dist".to_string()]);
        assert!(run.store().contains("build/dist"));
        assert_eq!(sink.events_of_type("step.succeeded").len(), 1);
    }

    #[tokio::test]
    async fn test_executor_aborts_stage_at_first_failure() {
        let builder = Arc::new(LocalBuilder::new());
        builder.fail_with("backend crashed");
        let sink = Arc::new(CollectingEventSink::new());
        let run = run_ctx(sink.clone());
        let stage = build_stage(builder);

        let report = StageExecutor::new().execute(&stage, &run, None).await;

        assert_eq!(report.status, StageStatus::Failed);
        assert_eq!(report.failed_step.as_deref(), Some("build-distributions"));
        assert_eq!(report.error_kind.as_deref(), Some("build_failure"));
        assert!(run.store().is_empty());
        assert_eq!(sink.events_of_type("stage.failed").len(), 1);
    }

    #[tokio::test]
    async fn test_executor_records_retryable_kind() {
        let mut mock = MockBuildAdapter::new();
        mock.expect_build()
            .times(1)
            .returning(|_| Err(AdapterError::network_failure("index unreachable")));

        let run = run_ctx(Arc::new(CollectingEventSink::new()));
        let stage = build_stage(Arc::new(mock));

        let report = StageExecutor::new().execute(&stage, &run, None).await;

        assert_eq!(report.error_kind.as_deref(), Some("network_failure"));
        assert!(report.is_retryable());
    }

    /// A step that hands back the same bundle name twice, so its second
    /// commit conflicts.
    #[derive(Debug)]
    struct DoubleCommitStep;

    #[async_trait]
    impl Step for DoubleCommitStep {
        fn id(&self) -> &str {
            "stage-distributions"
        }

        async fn run(&self, ctx: &StepContext) -> Result<StepOutput, ReleaseflowError> {
            Ok(StepOutput::empty()
                .with_artifact(Artifact::new("dist", ctx.stage_name()))
                .with_artifact(Artifact::new("dist", ctx.stage_name())))
        }
    }

    #[tokio::test]
    async fn test_failed_commit_backs_out_the_steps_own_bundles() {
        let sink = Arc::new(CollectingEventSink::new());
        let run = run_ctx(sink.clone());
        let stage = StageSpec::new("build", vec![Arc::new(DoubleCommitStep)]);

        let report = StageExecutor::new().execute(&stage, &run, None).await;

        assert_eq!(report.status, StageStatus::Failed);
        assert_eq!(report.failed_step.as_deref(), Some("stage-distributions"));
        assert!(run.store().is_empty());
        assert!(report.produced.is_empty());
        assert!(sink.events_of_type("artifact.published").is_empty());
    }
}
