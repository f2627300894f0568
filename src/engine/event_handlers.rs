// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info, warn};

use crate::dag::{ScheduledTask, Scheduler, TaskRunState};
use crate::engine::core::RunReport;
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeOptions, TaskName, TaskOutcome, TriggerReason};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// The first pipeline pass finished: start watching (and serving).
    StartWatching,
    /// Request that the process exits (non-watching runs, once idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle the request to run the whole pipeline.
///
/// The run started here is the build pass; `build_run` remembers its id so
/// completion handling can tell when it is over.
pub fn handle_run_pipeline(scheduler: &mut Scheduler, build_run: &mut Option<u64>) -> CoreStep {
    if !scheduler.is_idle() {
        warn!("pipeline run requested while a run is active; ignoring");
        return CoreStep::continue_with(Vec::new());
    }

    scheduler.start_new_run();
    *build_run = scheduler.current_run_id();
    info!(run_id = ?build_run, "starting pipeline pass");

    let ready = scheduler.handle_full_run();
    let mut commands = Vec::new();
    if !ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(ready));
    }
    CoreStep::continue_with(commands)
}

/// Handle a single-task trigger.
///
/// - Idle scheduler: start a new run with this task plus anything queued.
/// - Active run, task not in it: merge the task into the active run.
/// - Active run, task already in it: defer to the trigger queue.
pub fn handle_task_trigger(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    task: TaskName,
    reason: TriggerReason,
) -> CoreStep {
    debug!(task = %task, ?reason, "task triggered");

    if scheduler.is_idle() {
        let mut triggers = queue.drain_pending();
        if !triggers.contains(&task) {
            triggers.push(task);
        }
        return start_new_run_from_triggers(scheduler, triggers);
    }

    let mut commands = Vec::new();
    match scheduler.run_state_of(&task) {
        None => {
            warn!(task = %task, "trigger for task outside the pipeline; ignoring");
        }
        Some(TaskRunState::NotInRun) => {
            let ready = scheduler.handle_trigger(&task);
            if !ready.is_empty() {
                commands.push(CoreCommand::DispatchTasks(ready));
            }
        }
        Some(_) => {
            queue.record_trigger(&task);
        }
    }
    CoreStep::continue_with(commands)
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    queue: &mut TriggerQueue,
    options: &RuntimeOptions,
    report: &mut RunReport,
    build_run: &mut Option<u64>,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    let mut commands = Vec::new();
    let run_id = scheduler.current_run_id();

    let step = scheduler.step_completion(&task, outcome);
    if outcome == TaskOutcome::Success {
        report.failed_tasks.remove(&task);
    }
    report.failed_tasks.extend(step.newly_failed);
    if !step.newly_scheduled.is_empty() {
        commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
    }

    if step.run_just_finished && run_id.is_some() && run_id == *build_run {
        *build_run = None;
        report.build_pass_done = true;
        if report.failed_tasks.is_empty() {
            info!("pipeline pass finished");
        } else {
            warn!(failed = ?report.failed_tasks, "pipeline pass finished with failures");
        }
        if options.watch_after_build {
            commands.push(CoreCommand::StartWatching);
        }
    }

    commands.extend(maybe_start_queued_run(scheduler, queue));

    let mut keep_running = true;
    if options.exit_when_idle && scheduler.is_idle() && queue.is_empty() {
        keep_running = false;
        commands.push(CoreCommand::RequestExit);
    }

    CoreStep {
        commands,
        keep_running,
    }
}

/// Start a run seeded with the given task triggers.
pub fn start_new_run_from_triggers(scheduler: &mut Scheduler, triggers: Vec<TaskName>) -> CoreStep {
    if triggers.is_empty() {
        return CoreStep::continue_with(Vec::new());
    }

    scheduler.start_new_run();
    let mut all_ready = Vec::new();
    for task in triggers {
        all_ready.extend(scheduler.handle_trigger(&task));
    }

    let mut commands = Vec::new();
    if !all_ready.is_empty() {
        commands.push(CoreCommand::DispatchTasks(all_ready));
    }
    CoreStep::continue_with(commands)
}

/// If the scheduler is idle and there are queued triggers, start a new run.
fn maybe_start_queued_run(scheduler: &mut Scheduler, queue: &mut TriggerQueue) -> Vec<CoreCommand> {
    if !scheduler.is_idle() {
        return Vec::new();
    }
    let triggers = queue.drain_pending();
    start_new_run_from_triggers(scheduler, triggers).commands
}
