use std::str::FromStr;
use serde::Deserialize;

/// Behaviour when a task is triggered again while it is already part of the
/// active run.
///
/// - `Queue`: remember the trigger and start a new run when the current one
///   finishes (default behaviour).
/// - `Cancel`: drop any previously queued triggers and only keep the latest
///   one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    Queue,
    Cancel,
}

impl Default for TriggerWhileRunningBehaviour {
    fn default() -> Self {
        TriggerWhileRunningBehaviour::Queue
    }
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}

/// Which transformation a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Delete the output root.
    Clean,
    /// Copy matched files verbatim.
    Copy,
    /// Assemble markup from `@@include(...)` directives.
    Include,
    /// Stack every matched SVG icon into one sprite sheet.
    Sprite,
    /// Delegate to an external tool through a shell command template.
    Command,
}

/// What a failed task means for the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Mark the task failed and fail every dependent in the current run.
    Fail,
    /// Report the failure but let dependents proceed.
    Continue,
}

impl Default for OnError {
    fn default() -> Self {
        OnError::Fail
    }
}

/// How a `command` task maps inputs onto invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandMode {
    /// One invocation per matched input file.
    Each,
    /// One invocation for the whole input set.
    Once,
}

impl Default for CommandMode {
    fn default() -> Self {
        CommandMode::Each
    }
}

/// Coarse classification of a task failure, carried back to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A source file could not be transformed (bad syntax, broken include).
    Transform,
    /// An external tool exited unsuccessfully.
    Command(Option<i32>),
    /// Reading or writing files failed.
    Io,
}
