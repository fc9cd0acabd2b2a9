//! Run coordination.
//!
//! One coordinator drives one pipeline. For each run it walks the stages
//! in execution order, checks dependencies, waits on gates within their
//! timeout, hands stages to the executor, and cascades skips past any
//! failure. There is no rollback; completed stages stay completed.

use super::report::{RunReport, StageReport};
use super::retry::RetryPolicy;
use super::spec::{Pipeline, StageSpec};
use crate::cancellation::CancellationToken;
use crate::context::RunContext;
use crate::core::{RunStatus, StageStatus};
use crate::errors::AdapterError;
use crate::events::{EventSink, NoOpEventSink};
use crate::executor::StageExecutor;
use crate::gates::GateGrant;
use crate::trigger::PushEvent;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// What happens to a failed stage's partial artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactPolicy {
    /// Keep everything the run committed, attributed to the run report.
    #[default]
    RetainOnFailure,

    /// Drop bundles committed by a stage that ultimately failed.
    DiscardFailedStage,
}

/// Drives runs of one pipeline.
pub struct Coordinator {
    pipeline: Pipeline,
    executor: StageExecutor,
    event_sink: Arc<dyn EventSink>,
    cancellation: Arc<CancellationToken>,
    retry: RetryPolicy,
    artifact_policy: ArtifactPolicy,
}

impl Coordinator {
    /// Creates a coordinator with no event sink, no cancellation source,
    /// and retries disabled.
    #[must_use]
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            executor: StageExecutor::new(),
            event_sink: Arc::new(NoOpEventSink),
            cancellation: Arc::new(CancellationToken::new()),
            retry: RetryPolicy::disabled(),
            artifact_policy: ArtifactPolicy::default(),
        }
    }

    /// Sets the event sink runs report to.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the cancellation token runs observe between stages.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// Sets the retry policy for transport-level stage failures.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the artifact policy for failed stages.
    #[must_use]
    pub fn with_artifact_policy(mut self, policy: ArtifactPolicy) -> Self {
        self.artifact_policy = policy;
        self
    }

    /// The pipeline this coordinator drives.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Runs the pipeline once for the given trigger.
    ///
    /// The run halts at the first failed stage; stages downstream of the
    /// failure are skipped, as is any stage whose dependencies did not
    /// succeed. Cancellation is observed between stages only; an in-flight
    /// stage finishes before the run winds down.
    pub async fn run(&self, trigger: PushEvent) -> RunReport {
        let started = Instant::now();
        let run = Arc::new(
            RunContext::new(trigger.clone())
                .with_event_sink(Arc::clone(&self.event_sink))
                .with_cancellation(Arc::clone(&self.cancellation)),
        );

        info!(
            run_id = %run.identity().run_id,
            pipeline = %self.pipeline.name(),
            branch = %trigger.branch,
            commit = %trigger.short_commit(),
            "run started"
        );
        run.try_emit_event(
            "run.started",
            Some(serde_json::json!({ "pipeline": self.pipeline.name() })),
        );

        let mut reports: HashMap<String, StageReport> = HashMap::new();
        let mut cancelled = false;

        for name in self.pipeline.execution_order() {
            if run.is_cancelled() {
                cancelled = true;
                let reason = run
                    .cancel_reason()
                    .unwrap_or_else(|| "cancelled".to_string());
                let report = StageReport::skipped(name, format!("run cancelled: {reason}"));
                run.try_emit_event(
                    "stage.skipped",
                    Some(serde_json::json!({ "stage": name, "reason": report.skip_reason })),
                );
                reports.insert(name.clone(), report);
                continue;
            }

            // Every stage in the order map exists; the builder guarantees it.
            let Some(stage) = self.pipeline.stage(name) else {
                continue;
            };

            if let Some(report) = Self::skip_for_dependencies(stage, &reports) {
                info!(stage = %name, reason = ?report.skip_reason, "stage skipped");
                run.try_emit_event(
                    "stage.skipped",
                    Some(serde_json::json!({ "stage": name, "reason": report.skip_reason })),
                );
                reports.insert(name.clone(), report);
                continue;
            }

            let grant = match Self::wait_for_gate(stage, &run).await {
                Ok(grant) => grant,
                Err(report) => {
                    reports.insert(name.clone(), report);
                    continue;
                }
            };

            let report = self.execute_with_retry(stage, &run, grant).await;

            if report.status == StageStatus::Failed
                && self.artifact_policy == ArtifactPolicy::DiscardFailedStage
            {
                run.store().discard_stage(name);
            }

            reports.insert(name.clone(), report);
        }

        let status = Self::overall_status(cancelled, reports.values());
        let stages = self
            .pipeline
            .execution_order()
            .iter()
            .filter_map(|name| reports.remove(name))
            .collect();

        // Snapshot the bundles into the report, then tear the store down.
        let artifacts = run.store().snapshot();
        run.store().clear();

        info!(
            run_id = %run.identity().run_id,
            status = ?status,
            "run finished"
        );
        run.try_emit_event("run.finished", Some(serde_json::json!({ "status": status })));

        RunReport {
            run_id: run.identity().run_id,
            pipeline: self.pipeline.name().to_string(),
            trigger,
            status,
            cancel_reason: run.cancel_reason(),
            stages,
            artifacts,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Skips the stage if any dependency did not finish as succeeded.
    fn skip_for_dependencies(
        stage: &StageSpec,
        reports: &HashMap<String, StageReport>,
    ) -> Option<StageReport> {
        let mut unsatisfied: Vec<&str> = stage
            .dependencies()
            .iter()
            .filter(|dep| {
                reports
                    .get(dep.as_str())
                    .map_or(true, |r| !r.status.satisfies_dependency())
            })
            .map(String::as_str)
            .collect();

        if unsatisfied.is_empty() {
            return None;
        }

        unsatisfied.sort_unstable();
        Some(StageReport::skipped(
            stage.name(),
            format!("dependency '{}' did not succeed", unsatisfied.join("', '")),
        ))
    }

    /// Waits for the stage's gate within its timeout, if the stage is
    /// gated.
    async fn wait_for_gate(
        stage: &StageSpec,
        run: &Arc<RunContext>,
    ) -> Result<Option<GateGrant>, StageReport> {
        let Some(config) = stage.gate() else {
            return Ok(None);
        };

        let waited = Instant::now();
        run.try_emit_event(
            "gate.waiting",
            Some(serde_json::json!({
                "stage": stage.name(),
                "gate": config.gate.describe(),
                "timeout_ms": config.timeout.as_millis() as u64,
            })),
        );

        match tokio::time::timeout(config.timeout, config.gate.wait_ready()).await {
            Ok(Ok(grant)) => {
                run.try_emit_event(
                    "gate.granted",
                    Some(serde_json::json!({
                        "stage": stage.name(),
                        "environment": grant.environment,
                        "approved_by": grant.approved_by,
                    })),
                );
                Ok(Some(grant))
            }
            Ok(Err(err)) => {
                warn!(stage = %stage.name(), error = %err, "gate failed");
                run.try_emit_event(
                    "stage.failed",
                    Some(serde_json::json!({ "stage": stage.name(), "error": err.to_string() })),
                );
                Err(StageReport::failed(stage.name(), err.to_string(), err.kind()))
            }
            Err(_elapsed) => {
                let err = AdapterError::gate_timeout(stage.name(), waited.elapsed().as_millis() as u64);
                warn!(stage = %stage.name(), "gate timed out");
                run.try_emit_event(
                    "gate.timeout",
                    Some(serde_json::json!({ "stage": stage.name(), "gate": config.gate.describe() })),
                );
                run.try_emit_event(
                    "stage.failed",
                    Some(serde_json::json!({ "stage": stage.name(), "error": err.to_string() })),
                );
                Err(StageReport::failed(stage.name(), err.to_string(), err.kind()))
            }
        }
    }

    /// Runs the stage, replaying it on transport failures when the retry
    /// policy allows. Partial bundles from a failed attempt are dropped
    /// before the replay.
    async fn execute_with_retry(
        &self,
        stage: &StageSpec,
        run: &Arc<RunContext>,
        grant: Option<GateGrant>,
    ) -> StageReport {
        let mut attempt = 1;
        let mut report = self.executor.execute(stage, run, grant.clone()).await;

        while report.is_retryable() && attempt < self.retry.max_attempts {
            let delay = self.retry.delay_for(attempt);
            warn!(
                stage = %stage.name(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying stage after transport failure"
            );
            run.try_emit_event(
                "stage.retrying",
                Some(serde_json::json!({ "stage": stage.name(), "attempt": attempt })),
            );

            tokio::time::sleep(delay).await;
            run.store().discard_stage(stage.name());

            attempt += 1;
            report = self.executor.execute(stage, run, grant.clone()).await;
        }

        report
    }

    fn overall_status<'a>(
        cancelled: bool,
        reports: impl Iterator<Item = &'a StageReport>,
    ) -> RunStatus {
        if cancelled {
            return RunStatus::Cancelled;
        }

        if reports.into_iter().any(|r| r.status == StageStatus::Failed) {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("pipeline", &self.pipeline.name())
            .field("retry", &self.retry)
            .field("artifact_policy", &self.artifact_policy)
            .finish_non_exhaustive()
    }
}
