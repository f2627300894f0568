// src/engine/mod.rs

//! Orchestration engine for assetdag.
//!
//! This module ties together:
//! - the pipeline scheduler
//! - the trigger queue (what happens when triggers arrive while a run is active)
//! - the main runtime event loop that reacts to:
//!   - the initial build request
//!   - file-watch triggers
//!   - task completion events
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::types::FailureKind;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a task run for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(FailureKind),
}

/// Why a task was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// Part of the initial pipeline pass.
    Pipeline,
    /// A watched source changed.
    FileWatch,
    /// Requested directly (tests, tooling).
    Manual,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// Exit once the scheduler is idle and nothing is queued.
    pub exit_when_idle: bool,
    /// Start watching (and serving) once the first pipeline pass finishes.
    pub watch_after_build: bool,
}

/// Events flowing into the runtime from the entry point, watchers and the
/// executor.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// Run the whole pipeline once.
    RunPipeline,
    /// A single task should run.
    TaskTriggered {
        task: TaskName,
        reason: TriggerReason,
    },
    /// A dispatched task finished.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::{CoreRuntime, RunReport};
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use crate::types::TriggerWhileRunningBehaviour;
pub use runtime::{Runtime, SessionLauncher};
