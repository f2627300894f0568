// src/dag/scheduler.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::{AssetdagError, Result};
use crate::pipeline::Pipeline;
use crate::tasks::Task;

/// Scheduler holds the immutable pipeline DAG plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - deciding when a task is ready (every predecessor in the run finished)
/// - failing dependents when a task fails without `on_error = "continue"`
///
/// A full run puts every task of the pipeline in the run. A trigger puts
/// only the triggered task in; predecessors outside the run count as
/// satisfied and dependents are not pulled in.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    tasks: HashMap<TaskName, TaskInfo>,
    run_counter: u64,
    current_run_id: Option<u64>,
}

impl Scheduler {
    /// Build a scheduler for `pipeline`, looking its tasks up in `tasks`.
    pub fn new(pipeline: &Pipeline, tasks: &BTreeMap<TaskName, Arc<Task>>) -> Result<Self> {
        let graph = DagGraph::from_pipeline(pipeline);

        let mut infos = HashMap::new();
        for name in pipeline.tasks() {
            let task = tasks
                .get(name)
                .ok_or_else(|| AssetdagError::TaskNotFound(name.clone()))?;
            let deps = graph.dependencies_of(name).to_vec();
            infos.insert(name.clone(), TaskInfo::new(Arc::clone(task), deps));
        }

        Ok(Self {
            graph,
            tasks: infos,
            run_counter: 0,
            current_run_id: None,
        })
    }

    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// Read-only view of the given task's run state; `None` for tasks
    /// outside the pipeline.
    pub fn run_state_of(&self, task: &str) -> Option<TaskRunState> {
        let info = self.tasks.get(task)?;
        Some(info.run_state.into())
    }

    /// Names of tasks participating in the active run, in pipeline order.
    pub fn tasks_in_current_run(&self) -> Vec<TaskName> {
        if self.current_run_id.is_none() {
            return Vec::new();
        }
        self.graph
            .tasks()
            .filter(|name| self.tasks.get(*name).is_some_and(|i| i.run_state.is_some()))
            .map(str::to_string)
            .collect()
    }

    /// Whether the dependencies of `task` are satisfied for the current run.
    pub fn deps_satisfied(&self, task: &str) -> Option<bool> {
        let info = self.tasks.get(task)?;
        Some(ReadOnlyStateManager::new(&self.tasks).deps_satisfied_for_info(info))
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.graph.tasks()
    }

    /// Start a new run, resetting per-run state.
    pub fn start_new_run(&mut self) {
        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);

        for info in self.tasks.values_mut() {
            info.run_state = None;
        }

        debug!(run_id = self.run_counter, "scheduler: starting new run");
    }

    /// Put every task of the pipeline into the run (production API).
    pub fn handle_full_run(&mut self) -> Vec<ScheduledTask> {
        self.full_run_step_internal().newly_scheduled
    }

    /// Put one task into the run (production API).
    pub fn handle_trigger(&mut self, task: &str) -> Vec<ScheduledTask> {
        self.trigger_step_internal(task).newly_scheduled
    }

    /// Record the outcome of a dispatched task (production API).
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Vec<ScheduledTask> {
        self.completion_step_internal(task, outcome).newly_scheduled
    }

    /// Manual-step variant of `handle_full_run`.
    pub fn step_full_run(&mut self) -> SchedulerStep {
        self.full_run_step_internal()
    }

    /// Manual-step variant of `handle_trigger`.
    pub fn step_trigger(&mut self, task: &str) -> SchedulerStep {
        self.trigger_step_internal(task)
    }

    /// Manual-step variant of `handle_completion`.
    pub fn step_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        self.completion_step_internal(task, outcome)
    }

    /// Clear `current_run_id` when every task is terminal.
    ///
    /// Returns `true` if this call transitioned the scheduler to idle.
    fn maybe_finish_run(&mut self) -> bool {
        if self.current_run_id.is_none() {
            return false;
        }

        let manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        if manager.all_tasks_terminal() {
            info!(run_id = self.current_run_id, "run finished");
            self.current_run_id = None;
            true
        } else {
            false
        }
    }

    fn ensure_active_run(&mut self, what: &str) {
        if self.current_run_id.is_none() {
            warn!("{what} with no active run; implicitly starting a new run");
            self.start_new_run();
        }
    }

    fn full_run_step_internal(&mut self) -> SchedulerStep {
        self.ensure_active_run("full run requested");

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        manager.mark_all_pending();
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            run_just_finished,
        }
    }

    fn trigger_step_internal(&mut self, task: &str) -> SchedulerStep {
        self.ensure_active_run("trigger received");

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        manager.mark_pending(task);
        let newly_scheduled = manager.collect_new_ready_tasks();
        let run_just_finished = self.maybe_finish_run();

        SchedulerStep {
            newly_scheduled,
            newly_failed: Vec::new(),
            run_just_finished,
        }
    }

    fn completion_step_internal(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return SchedulerStep::default();
        };

        let mut step = SchedulerStep::default();

        let Some(info) = self.tasks.get_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return step;
        };
        if info.run_state != Some(RunState::Running) {
            warn!(task = %task, state = ?info.run_state, "completion for task that is not running; ignoring");
            return step;
        }

        match outcome {
            TaskOutcome::Success => {
                info.run_state = Some(RunState::DoneSuccess);
                debug!(task = %info.name, run_id, "task completed successfully");
            }
            TaskOutcome::Failed(kind) => {
                info.run_state = Some(RunState::DoneFailed);
                step.newly_failed.push(info.name.clone());

                if info.tolerate_failure {
                    warn!(
                        task = %info.name,
                        run_id,
                        failure = ?kind,
                        "task failed; on_error = continue, dependents proceed"
                    );
                } else {
                    warn!(
                        task = %info.name,
                        run_id,
                        failure = ?kind,
                        "task failed; failing dependents in this run"
                    );
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
                    step.newly_failed.extend(manager.mark_dependents_failed(task));
                }
            }
        }

        let mut manager = StateManager::new(&self.graph, &mut self.tasks, self.current_run_id);
        step.newly_scheduled = manager.collect_new_ready_tasks();
        step.run_just_finished = self.maybe_finish_run();
        step
    }
}
