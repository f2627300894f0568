// src/dag/graph.rs

use std::collections::HashMap;

use crate::engine::TaskName;
use crate::pipeline::Pipeline;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Tasks that must complete before this one can run.
    deps: Vec<TaskName>,
    /// Tasks waiting on this one.
    dependents: Vec<TaskName>,
}

/// Adjacency view of a compiled pipeline, keyed by task name.
///
/// Acyclicity is checked when the config is validated; here we only keep
/// what the scheduler needs to walk the graph.
#[derive(Debug, Clone)]
pub struct DagGraph {
    order: Vec<TaskName>,
    nodes: HashMap<TaskName, DagNode>,
}

impl DagGraph {
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        let mut nodes: HashMap<TaskName, DagNode> = pipeline
            .tasks()
            .iter()
            .map(|t| (t.clone(), DagNode::default()))
            .collect();

        for (before, after) in pipeline.edges() {
            if let Some(node) = nodes.get_mut(after) {
                node.deps.push(before.clone());
            }
            if let Some(node) = nodes.get_mut(before) {
                node.dependents.push(after.clone());
            }
        }

        Self {
            order: pipeline.tasks().to_vec(),
            nodes,
        }
    }

    /// All task names, in pipeline order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }
}
