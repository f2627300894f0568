// src/config/validate.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::engine::TaskName;
use crate::errors::{AssetdagError, Result};
use crate::pipeline::Pipeline;
use crate::tasks::Task;
use crate::types::TaskKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        ensure_has_pipelines(&raw)?;
        validate_global_config(&raw)?;

        let tasks = compile_tasks(&raw)?;

        let mut pipelines = BTreeMap::new();
        for (name, pc) in raw.pipeline.iter() {
            let pipeline = Pipeline::compose(name, pc)?;
            validate_pipeline(&pipeline, &tasks)?;
            pipelines.insert(name.clone(), pipeline);
        }

        Ok(ConfigFile::new_unchecked(
            raw.config, raw.paths, raw.server, tasks, pipelines,
        ))
    }
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(AssetdagError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn ensure_has_pipelines(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipeline.is_empty() {
        return Err(AssetdagError::ConfigError(
            "config must contain at least one [pipeline.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(AssetdagError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn compile_tasks(cfg: &RawConfigFile) -> Result<BTreeMap<TaskName, Arc<Task>>> {
    let mut tasks = BTreeMap::new();
    for (name, tc) in cfg.task.iter() {
        let task = Task::from_config(name, tc, &cfg.paths)?;
        tasks.insert(name.clone(), Arc::new(task));
    }
    Ok(tasks)
}

/// Check a composed pipeline against the compiled tasks:
///
/// - every node names a known task,
/// - the ordering constraints are acyclic,
/// - every `clean` task strictly precedes every other task of the pipeline.
pub fn validate_pipeline(
    pipeline: &Pipeline,
    tasks: &BTreeMap<TaskName, Arc<Task>>,
) -> Result<()> {
    for node in pipeline.tasks() {
        if !tasks.contains_key(node) {
            return Err(AssetdagError::ConfigError(format!(
                "pipeline '{}' references unknown task '{}'",
                pipeline.name(),
                node
            )));
        }
    }

    // Edge direction: before -> after.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for node in pipeline.tasks() {
        graph.add_node(node.as_str());
    }
    for (before, after) in pipeline.edges() {
        graph.add_edge(before.as_str(), after.as_str(), ());
    }

    if let Err(cycle) = toposort(&graph, None) {
        return Err(AssetdagError::DagCycle(format!(
            "cycle detected in pipeline '{}' involving task '{}'",
            pipeline.name(),
            cycle.node_id()
        )));
    }

    let cleans: Vec<&str> = pipeline
        .tasks()
        .iter()
        .map(|n| n.as_str())
        .filter(|n| tasks.get(*n).is_some_and(|t| t.kind() == TaskKind::Clean))
        .collect();

    for clean in cleans {
        for node in pipeline.tasks() {
            if node == clean {
                continue;
            }
            if !has_path_connecting(&graph, clean, node.as_str(), None) {
                return Err(AssetdagError::ConfigError(format!(
                    "pipeline '{}': task '{}' is not ordered after clean task '{}'",
                    pipeline.name(),
                    node,
                    clean
                )));
            }
        }
    }

    Ok(())
}
