// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::DagGraph;
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    current_run_id: Option<u64>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a DagGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        current_run_id: Option<u64>,
    ) -> Self {
        Self {
            graph,
            tasks,
            current_run_id,
        }
    }

    /// Add a task to the run. Tasks already in the run keep their state.
    ///
    /// Returns whether the task was newly added.
    pub fn mark_pending(&mut self, name: &str) -> bool {
        match self.tasks.get_mut(name) {
            Some(info) if info.run_state.is_none() => {
                info.run_state = Some(RunState::Pending);
                debug!(task = %info.name, "marked Pending for this run");
                true
            }
            Some(_) => false,
            None => {
                warn!(task = %name, "trigger for task outside the pipeline; ignoring");
                false
            }
        }
    }

    /// Add every task of the pipeline to the run.
    pub fn mark_all_pending(&mut self) {
        let names: Vec<TaskName> = self.graph.tasks().map(str::to_string).collect();
        for name in names {
            self.mark_pending(&name);
        }
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        ReadOnlyStateManager::new(self.tasks).deps_satisfied_for_info(info)
    }

    /// Mark the pending transitive dependents of a failed task as
    /// `DoneFailed` for this run.
    ///
    /// Returns the tasks newly marked as failed, excluding `failed_task`.
    pub fn mark_dependents_failed(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut newly_failed = Vec::new();

        while let Some(name) = stack.pop() {
            let Some(info) = self.tasks.get_mut(&name) else {
                continue;
            };
            if info.run_state == Some(RunState::Pending) {
                info.run_state = Some(RunState::DoneFailed);
                debug!(
                    task = %info.name,
                    upstream = %failed_task,
                    "marking dependent as DoneFailed due to upstream failure"
                );
                newly_failed.push(info.name.clone());
                stack.extend(self.graph.dependents_of(&name).iter().cloned());
            }
        }

        newly_failed
    }

    /// Mark every `Pending` task whose dependencies are satisfied as
    /// `Running` and return them, in pipeline order.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<ScheduledTask> {
        let candidates: Vec<TaskName> = self
            .graph
            .tasks()
            .filter(|name| {
                self.tasks.get(*name).is_some_and(|info| {
                    info.run_state == Some(RunState::Pending) && self.deps_satisfied_for_info(info)
                })
            })
            .map(str::to_string)
            .collect();

        let mut ready = Vec::with_capacity(candidates.len());
        for name in candidates {
            if let Some(info) = self.tasks.get_mut(&name) {
                if info.dispatch_count > 0 {
                    info!(task = %info.name, run_id = self.current_run_id, "re-running task");
                } else {
                    info!(task = %info.name, run_id = self.current_run_id, "starting task");
                }

                info.run_state = Some(RunState::Running);
                info.dispatch_count += 1;
                ready.push(ScheduledTask::from_task_info(
                    info,
                    self.current_run_id.unwrap_or(0),
                ));
            }
        }

        ready
    }

    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.values().any(|info| {
            matches!(
                info.run_state,
                Some(RunState::Pending) | Some(RunState::Running)
            )
        })
    }
}

/// Shared-access view used to check dependency satisfaction.
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a HashMap<TaskName, TaskInfo>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a HashMap<TaskName, TaskInfo>) -> Self {
        Self { tasks }
    }

    /// A dependency is satisfied when it succeeded in this run, failed with
    /// `on_error = "continue"`, or is not part of this run at all.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep_name| {
            let Some(dep) = self.tasks.get(dep_name) else {
                warn!(task = %info.name, dep = %dep_name, "dependency missing from tasks map");
                return false;
            };
            match dep.run_state {
                Some(RunState::DoneSuccess) | None => true,
                Some(RunState::DoneFailed) => dep.tolerate_failure,
                Some(RunState::Pending) | Some(RunState::Running) => false,
            }
        })
    }
}
