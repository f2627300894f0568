// src/pipeline/compose.rs

//! Series/parallel composition into an explicit edge list.

use std::collections::HashSet;

use crate::config::model::StepConfig;
use crate::engine::TaskName;
use crate::errors::{AssetdagError, Result};

/// Entry and exit nodes of a composed fragment.
///
/// Composing `A` then `B` in series connects every exit of `A` to every
/// entry of `B`. A parallel group's entries/exits are the union of its
/// members'. Empty groups produce empty fragments and are skipped.
#[derive(Debug, Default)]
struct Fragment {
    entries: Vec<TaskName>,
    exits: Vec<TaskName>,
}

impl Fragment {
    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct Composer<'a> {
    pipeline: &'a str,
    seen: HashSet<TaskName>,
    tasks: Vec<TaskName>,
    edges: Vec<(TaskName, TaskName)>,
}

/// Compile top-level `steps` (a series) into `(tasks, edges)`.
///
/// A task may appear at most once per pipeline.
pub fn compose_steps(
    pipeline: &str,
    steps: &[StepConfig],
) -> Result<(Vec<TaskName>, Vec<(TaskName, TaskName)>)> {
    let mut composer = Composer {
        pipeline,
        seen: HashSet::new(),
        tasks: Vec::new(),
        edges: Vec::new(),
    };

    composer.series(steps)?;

    if composer.tasks.is_empty() {
        return Err(AssetdagError::ConfigError(format!(
            "pipeline '{pipeline}' has no tasks"
        )));
    }

    Ok((composer.tasks, composer.edges))
}

impl Composer<'_> {
    fn step(&mut self, step: &StepConfig) -> Result<Fragment> {
        match step {
            StepConfig::Task(name) => self.task(name),
            StepConfig::Series { series } => self.series(series),
            StepConfig::Parallel { parallel } => self.parallel(parallel),
        }
    }

    fn task(&mut self, name: &str) -> Result<Fragment> {
        if !self.seen.insert(name.to_string()) {
            return Err(AssetdagError::ConfigError(format!(
                "pipeline '{}' lists task '{}' more than once",
                self.pipeline, name
            )));
        }
        self.tasks.push(name.to_string());
        Ok(Fragment {
            entries: vec![name.to_string()],
            exits: vec![name.to_string()],
        })
    }

    fn series(&mut self, steps: &[StepConfig]) -> Result<Fragment> {
        let mut out = Fragment::default();

        for step in steps {
            let next = self.step(step)?;
            if next.is_empty() {
                continue;
            }

            if out.is_empty() {
                out.entries = next.entries;
            } else {
                for before in &out.exits {
                    for after in &next.entries {
                        self.edges.push((before.clone(), after.clone()));
                    }
                }
            }
            out.exits = next.exits;
        }

        Ok(out)
    }

    fn parallel(&mut self, steps: &[StepConfig]) -> Result<Fragment> {
        let mut out = Fragment::default();
        for step in steps {
            let next = self.step(step)?;
            out.entries.extend(next.entries);
            out.exits.extend(next.exits);
        }
        Ok(out)
    }
}
