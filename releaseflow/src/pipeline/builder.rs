//! Pipeline construction and validation.

use super::spec::{Pipeline, StageSpec};
use crate::errors::{CycleDetectedError, PipelineValidationError};
use std::collections::{HashMap, HashSet};

/// Builds a [`Pipeline`], validating the stage graph at `build()` time.
#[derive(Debug, Default)]
#[must_use]
pub struct PipelineBuilder {
    name: String,
    stages: Vec<StageSpec>,
}

impl PipelineBuilder {
    /// Creates a builder for a named pipeline.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Adds a stage. Stages run in dependency order; declaration order
    /// breaks ties.
    pub fn stage(mut self, stage: StageSpec) -> Self {
        self.stages.push(stage);
        self
    }

    /// Validates the stage graph and produces the pipeline.
    ///
    /// # Errors
    ///
    /// Rejects empty pipelines, duplicate stage names, dependencies on
    /// unknown stages, self-dependencies, and dependency cycles.
    pub fn build(self) -> Result<Pipeline, PipelineValidationError> {
        if self.stages.is_empty() {
            return Err(PipelineValidationError::new(
                "pipeline must contain at least one stage",
            ));
        }

        let mut seen = HashSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.name().to_string()) {
                return Err(PipelineValidationError::new(format!(
                    "duplicate stage name '{}'",
                    stage.name()
                ))
                .with_stages(vec![stage.name().to_string()]));
            }
        }

        for stage in &self.stages {
            for dep in stage.dependencies() {
                if dep == stage.name() {
                    return Err(PipelineValidationError::new(format!(
                        "stage '{}' depends on itself",
                        stage.name()
                    ))
                    .with_stages(vec![stage.name().to_string()]));
                }
                if !seen.contains(dep) {
                    return Err(PipelineValidationError::new(format!(
                        "stage '{}' depends on unknown stage '{dep}'",
                        stage.name()
                    ))
                    .with_stages(vec![stage.name().to_string(), dep.clone()]));
                }
            }
        }

        let order = topological_order(&self.stages)?;

        let stages = self
            .stages
            .into_iter()
            .map(|stage| (stage.name().to_string(), stage))
            .collect();

        Ok(Pipeline::new(self.name, stages, order))
    }
}

/// Orders stages so every dependency precedes its dependents, keeping
/// declaration order among unordered stages.
fn topological_order(stages: &[StageSpec]) -> Result<Vec<String>, PipelineValidationError> {
    let mut in_degree: HashMap<&str, usize> = stages
        .iter()
        .map(|s| (s.name(), s.dependencies().len()))
        .collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for stage in stages {
        for dep in stage.dependencies() {
            dependents.entry(dep.as_str()).or_default().push(stage.name());
        }
    }

    let mut order = Vec::with_capacity(stages.len());
    let mut remaining: Vec<&str> = stages.iter().map(StageSpec::name).collect();

    while !remaining.is_empty() {
        let Some(pos) = remaining.iter().position(|name| in_degree[name] == 0) else {
            return Err(find_cycle(stages).into());
        };

        let name = remaining.remove(pos);
        order.push(name.to_string());

        if let Some(next) = dependents.get(name) {
            for dependent in next {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                }
            }
        }
    }

    Ok(order)
}

/// Walks the graph depth-first to name one cycle for the error message.
fn find_cycle(stages: &[StageSpec]) -> CycleDetectedError {
    let by_name: HashMap<&str, &StageSpec> =
        stages.iter().map(|s| (s.name(), s)).collect();

    let mut visited = HashSet::new();
    for start in stages {
        let mut path: Vec<&str> = Vec::new();
        let mut on_path = HashSet::new();
        if let Some(cycle) = dfs(start.name(), &by_name, &mut visited, &mut path, &mut on_path) {
            return CycleDetectedError::new(cycle);
        }
    }

    CycleDetectedError::new(Vec::new())
}

fn dfs<'a>(
    node: &'a str,
    by_name: &HashMap<&str, &'a StageSpec>,
    visited: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
    on_path: &mut HashSet<&'a str>,
) -> Option<Vec<String>> {
    if on_path.contains(node) {
        let start = path.iter().position(|n| *n == node).unwrap_or(0);
        let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
        cycle.push(node.to_string());
        return Some(cycle);
    }
    if !visited.insert(node) {
        return None;
    }

    path.push(node);
    on_path.insert(node);

    if let Some(stage) = by_name.get(node) {
        for dep in stage.dependencies() {
            if let Some(cycle) = dfs(dep.as_str(), by_name, visited, path, on_path) {
                return Some(cycle);
            }
        }
    }

    path.pop();
    on_path.remove(node);
    None
}
