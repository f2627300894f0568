// src/watch/patterns.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use globset::GlobMatcher;

use crate::engine::TaskName;
use crate::pipeline::Pipeline;
use crate::tasks::Task;
use crate::tasks::sources::compile_glob;

/// One `(glob, task)` pair: a change matching `pattern` triggers `task`.
#[derive(Clone)]
pub struct WatchBinding {
    pub pattern: String,
    pub task: TaskName,
    matcher: GlobMatcher,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("pattern", &self.pattern)
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(pattern: &str, task: &str) -> Result<Self> {
        let matcher = compile_glob(pattern)
            .with_context(|| format!("building watch binding for task {task}"))?;
        Ok(Self {
            pattern: pattern.to_string(),
            task: task.to_string(),
            matcher,
        })
    }

    /// `rel_path` is relative to the project root, with `/` separators.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }
}

/// Every watch binding of a pipeline.
#[derive(Debug, Clone, Default)]
pub struct WatchBindings {
    bindings: Vec<WatchBinding>,
}

impl WatchBindings {
    pub fn new(bindings: Vec<WatchBinding>) -> Self {
        Self { bindings }
    }

    /// Bindings for every task of `pipeline` that declares `watch` globs.
    /// Tasks outside the pipeline are never triggered.
    pub fn from_pipeline(
        pipeline: &Pipeline,
        tasks: &BTreeMap<TaskName, Arc<Task>>,
    ) -> Result<Self> {
        let mut bindings = Vec::new();
        for name in pipeline.tasks() {
            let Some(task) = tasks.get(name) else {
                continue;
            };
            for pattern in task.watch() {
                bindings.push(WatchBinding::new(pattern, name)?);
            }
        }
        Ok(Self { bindings })
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WatchBinding> {
        self.bindings.iter()
    }

    /// Tasks bound to `rel_path`, deduplicated and sorted.
    pub fn tasks_for(&self, rel_path: &str) -> BTreeSet<TaskName> {
        self.bindings
            .iter()
            .filter(|b| b.matches(rel_path))
            .map(|b| b.task.clone())
            .collect()
    }
}
