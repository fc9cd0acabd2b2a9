//! Stage and pipeline definitions.

use crate::gates::GateConfig;
use crate::steps::Step;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The definition of one stage: a name, its steps, the stages it depends
/// on, and an optional environment gate.
#[derive(Clone)]
pub struct StageSpec {
    name: String,
    steps: Vec<Arc<dyn Step>>,
    dependencies: HashSet<String>,
    gate: Option<GateConfig>,
}

impl StageSpec {
    /// Creates a stage with the given steps and no dependencies.
    #[must_use]
    pub fn new(name: impl Into<String>, steps: Vec<Arc<dyn Step>>) -> Self {
        Self {
            name: name.into(),
            steps,
            dependencies: HashSet::new(),
            gate: None,
        }
    }

    /// Declares a dependency on another stage.
    #[must_use]
    pub fn depends_on(mut self, stage: impl Into<String>) -> Self {
        self.dependencies.insert(stage.into());
        self
    }

    /// Attaches an environment gate.
    #[must_use]
    pub fn with_gate(mut self, gate: GateConfig) -> Self {
        self.gate = Some(gate);
        self
    }

    /// The stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stage's steps, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Arc<dyn Step>] {
        &self.steps
    }

    /// The stages this stage depends on.
    #[must_use]
    pub fn dependencies(&self) -> &HashSet<String> {
        &self.dependencies
    }

    /// The environment gate, if the stage is gated.
    #[must_use]
    pub fn gate(&self) -> Option<&GateConfig> {
        self.gate.as_ref()
    }
}

impl std::fmt::Debug for StageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSpec")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .field("dependencies", &self.dependencies)
            .field("gated", &self.gate.is_some())
            .finish()
    }
}

/// A validated pipeline: stages plus a precomputed execution order.
///
/// Built through [`PipelineBuilder`](crate::pipeline::PipelineBuilder),
/// which rejects duplicate stages, unknown or self dependencies, and
/// cycles.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    stages: HashMap<String, StageSpec>,
    order: Vec<String>,
}

impl Pipeline {
    pub(crate) fn new(name: String, stages: HashMap<String, StageSpec>, order: Vec<String>) -> Self {
        Self {
            name,
            stages,
            order,
        }
    }

    /// The pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn execution_order(&self) -> &[String] {
        &self.order
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageSpec> {
        self.stages.get(name)
    }

    /// The number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_spec_builder() {
        let stage = StageSpec::new("publish", vec![])
            .depends_on("build")
            .depends_on("build");

        assert_eq!(stage.name(), "publish");
        assert_eq!(stage.dependencies().len(), 1);
        assert!(stage.gate().is_none());
    }
}
