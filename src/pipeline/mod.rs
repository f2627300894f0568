// src/pipeline/mod.rs

//! Pipelines: named compositions of tasks.
//!
//! A pipeline is described in config as nested `series` / `parallel` steps
//! and compiled by [`compose`] into an explicit DAG: nodes are task names,
//! edges are "must fully complete before" constraints. The scheduler only
//! ever sees this DAG.

pub mod compose;

use crate::config::model::PipelineConfig;
use crate::engine::TaskName;
use crate::errors::Result;

/// A compiled pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    name: String,
    /// Task names in order of first appearance.
    tasks: Vec<TaskName>,
    /// Ordering constraints `(before, after)`.
    edges: Vec<(TaskName, TaskName)>,
    watch: bool,
    serve: bool,
}

impl Pipeline {
    /// Compile a `[pipeline.<name>]` section.
    pub fn compose(name: &str, cfg: &PipelineConfig) -> Result<Self> {
        let (tasks, edges) = compose::compose_steps(name, &cfg.steps)?;
        Ok(Self {
            name: name.to_string(),
            tasks,
            edges,
            watch: cfg.watch,
            serve: cfg.serve,
        })
    }

    /// A pipeline that runs exactly one task, once.
    pub fn single(task: &str) -> Self {
        Self {
            name: task.to_string(),
            tasks: vec![task.to_string()],
            edges: Vec::new(),
            watch: false,
            serve: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    pub fn edges(&self) -> &[(TaskName, TaskName)] {
        &self.edges
    }

    pub fn contains(&self, task: &str) -> bool {
        self.tasks.iter().any(|t| t == task)
    }

    /// Whether the pipeline keeps watching after its build pass.
    pub fn watch(&self) -> bool {
        self.watch
    }

    /// Whether the pipeline serves the output root while watching.
    pub fn serve(&self) -> bool {
        self.serve && self.watch
    }

    /// Direct predecessors of `task`.
    pub fn dependencies_of(&self, task: &str) -> Vec<TaskName> {
        self.edges
            .iter()
            .filter(|(_, after)| after == task)
            .map(|(before, _)| before.clone())
            .collect()
    }
}
