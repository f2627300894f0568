// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`RuntimeEvent`]s and produces [`CoreCommand`]s for the
//! IO shell (`engine::runtime::Runtime`), which owns the channels, the
//! executor and the dev session. The core has no Tokio types and performs no
//! IO, so it can be unit tested directly.
//!
//! [`CoreCommand`]: crate::engine::CoreCommand

use std::collections::BTreeSet;

use crate::dag::Scheduler;
use crate::engine::event_handlers::{
    CoreStep, handle_run_pipeline, handle_task_completion, handle_task_trigger,
};
use crate::engine::queue::TriggerQueue;
use crate::engine::{RuntimeEvent, RuntimeOptions, TaskName};
use crate::types::TriggerWhileRunningBehaviour;

/// What happened over the lifetime of a runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Tasks whose most recent run failed, including dependents that could
    /// not run because of an upstream failure.
    pub failed_tasks: BTreeSet<TaskName>,
    /// Whether the initial pipeline pass finished.
    pub build_pass_done: bool,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.build_pass_done && self.failed_tasks.is_empty()
    }
}

#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    queue: TriggerQueue,
    options: RuntimeOptions,
    report: RunReport,
    /// Run id of the pipeline pass while it is in flight.
    build_run: Option<u64>,
}

impl CoreRuntime {
    pub fn new(
        scheduler: Scheduler,
        behaviour: TriggerWhileRunningBehaviour,
        queue_length: usize,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            scheduler,
            queue: TriggerQueue::new(behaviour, queue_length),
            options,
            report: RunReport::default(),
            build_run: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Handle a single runtime event, returning the commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::RunPipeline => handle_run_pipeline(&mut self.scheduler, &mut self.build_run),
            RuntimeEvent::TaskTriggered { task, reason } => {
                handle_task_trigger(&mut self.scheduler, &mut self.queue, task, reason)
            }
            RuntimeEvent::TaskCompleted { task, outcome } => handle_task_completion(
                &mut self.scheduler,
                &mut self.queue,
                &self.options,
                &mut self.report,
                &mut self.build_run,
                task,
                outcome,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::config::{PathsSection, PipelineConfig, StepConfig, TaskConfig};
    use crate::engine::{CoreCommand, TaskOutcome, TriggerReason};
    use crate::pipeline::Pipeline;
    use crate::tasks::Task;
    use crate::types::{FailureKind, TaskKind};

    fn core(options: RuntimeOptions) -> CoreRuntime {
        let cfg = PipelineConfig {
            steps: vec![
                StepConfig::Task("clean".into()),
                StepConfig::Parallel {
                    parallel: vec![StepConfig::Task("styles".into()), StepConfig::Task("markup".into())],
                },
            ],
            watch: options.watch_after_build,
            serve: false,
        };
        let pipeline = Pipeline::compose("default", &cfg).unwrap();

        let mut tasks = BTreeMap::new();
        tasks.insert(
            "clean".to_string(),
            Arc::new(
                Task::from_config("clean", &TaskConfig::of_kind(TaskKind::Clean), &PathsSection::default())
                    .unwrap(),
            ),
        );
        for name in ["styles", "markup"] {
            let mut tc = TaskConfig::of_kind(TaskKind::Copy);
            tc.src = vec![format!("src/{name}/*")];
            tc.dest = Some(PathBuf::from("dist"));
            tasks.insert(
                name.to_string(),
                Arc::new(Task::from_config(name, &tc, &PathsSection::default()).unwrap()),
            );
        }

        let scheduler = Scheduler::new(&pipeline, &tasks).unwrap();
        CoreRuntime::new(scheduler, TriggerWhileRunningBehaviour::Queue, 1, options)
    }

    fn dispatched(step: &CoreStep) -> Vec<String> {
        step.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks.iter().map(|t| t.name.clone())),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn completed(task: &str) -> RuntimeEvent {
        RuntimeEvent::TaskCompleted {
            task: task.to_string(),
            outcome: TaskOutcome::Success,
        }
    }

    #[test]
    fn one_shot_build_exits_when_idle() {
        let mut core = core(RuntimeOptions {
            exit_when_idle: true,
            watch_after_build: false,
        });

        assert_eq!(dispatched(&core.step(RuntimeEvent::RunPipeline)), vec!["clean"]);
        assert_eq!(dispatched(&core.step(completed("clean"))), vec!["styles", "markup"]);
        assert!(core.step(completed("styles")).keep_running);

        let last = core.step(completed("markup"));
        assert!(!last.keep_running);
        assert!(matches!(last.commands.last(), Some(CoreCommand::RequestExit)));
        assert!(core.report().is_success());
    }

    #[test]
    fn watching_starts_after_the_pass_and_triggers_run_single_tasks() {
        let mut core = core(RuntimeOptions {
            exit_when_idle: false,
            watch_after_build: true,
        });

        core.step(RuntimeEvent::RunPipeline);
        core.step(completed("clean"));
        core.step(completed("styles"));
        let end = core.step(completed("markup"));
        assert!(end.keep_running);
        assert!(end.commands.iter().any(|c| matches!(c, CoreCommand::StartWatching)));

        let step = core.step(RuntimeEvent::TaskTriggered {
            task: "styles".to_string(),
            reason: TriggerReason::FileWatch,
        });
        assert_eq!(dispatched(&step), vec!["styles"]);

        let done = core.step(completed("styles"));
        assert!(done.keep_running);
        assert!(!done.commands.iter().any(|c| matches!(c, CoreCommand::StartWatching)));
        assert!(core.is_idle());
    }

    #[test]
    fn retrigger_during_run_is_queued() {
        let mut core = core(RuntimeOptions {
            exit_when_idle: false,
            watch_after_build: true,
        });
        core.step(RuntimeEvent::TaskTriggered {
            task: "styles".to_string(),
            reason: TriggerReason::Manual,
        });
        let step = core.step(RuntimeEvent::TaskTriggered {
            task: "styles".to_string(),
            reason: TriggerReason::FileWatch,
        });
        assert!(dispatched(&step).is_empty());
        assert!(!core.queue_is_empty());

        let step = core.step(completed("styles"));
        assert_eq!(dispatched(&step), vec!["styles"]);
        assert!(core.queue_is_empty());
    }

    #[test]
    fn failures_are_reported_and_cleared_by_later_success() {
        let mut core = core(RuntimeOptions {
            exit_when_idle: false,
            watch_after_build: true,
        });
        core.step(RuntimeEvent::RunPipeline);
        core.step(completed("clean"));
        core.step(RuntimeEvent::TaskCompleted {
            task: "styles".to_string(),
            outcome: TaskOutcome::Failed(FailureKind::Command(Some(1))),
        });
        core.step(completed("markup"));
        assert!(core.report().build_pass_done);
        assert_eq!(
            core.report().failed_tasks.iter().cloned().collect::<Vec<_>>(),
            vec!["styles"]
        );

        core.step(RuntimeEvent::TaskTriggered {
            task: "styles".to_string(),
            reason: TriggerReason::FileWatch,
        });
        core.step(completed("styles"));
        assert!(core.report().is_success());
    }

    #[test]
    fn shutdown_stops_the_loop() {
        let mut core = core(RuntimeOptions::default());
        assert!(!core.step(RuntimeEvent::ShutdownRequested).keep_running);
    }
}
