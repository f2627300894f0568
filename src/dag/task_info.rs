// src/dag/task_info.rs

//! Task metadata and per-run state management.

use std::sync::Arc;

use crate::engine::TaskName;
use crate::tasks::Task;
use crate::types::OnError;

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Task is part of this run but waiting on dependencies.
    Pending,
    /// Task has been dispatched to the executor.
    Running,
    DoneSuccess,
    /// Task failed in this run (or was blocked by a failed dependency).
    DoneFailed,
}

/// Public, read-only view of a task's per-run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not participating in this run.
    NotInRun,
    Pending,
    Running,
    DoneSuccess,
    DoneFailed,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::DoneSuccess) => TaskRunState::DoneSuccess,
            Some(RunState::DoneFailed) => TaskRunState::DoneFailed,
        }
    }
}

/// Static task information plus per-run state.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    pub task: Arc<Task>,
    /// Direct predecessors in the pipeline.
    pub deps: Vec<TaskName>,
    /// A failure of this task still lets its dependents run.
    pub tolerate_failure: bool,

    /// Per-run state (None if not participating in the current run).
    pub run_state: Option<RunState>,

    /// How many times the task has been dispatched so far.
    pub dispatch_count: u64,
}

impl TaskInfo {
    pub fn new(task: Arc<Task>, deps: Vec<TaskName>) -> Self {
        Self {
            name: task.name().to_string(),
            tolerate_failure: task.on_error() == OnError::Continue,
            task,
            deps,
            run_state: None,
            dispatch_count: 0,
        }
    }
}

/// A task the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub task: Arc<Task>,
    /// All tasks dispatched within the same run share a `run_id`.
    pub run_id: u64,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo, run_id: u64) -> Self {
        Self {
            name: info.name.clone(),
            task: Arc::clone(&info.task),
            run_id,
        }
    }
}
