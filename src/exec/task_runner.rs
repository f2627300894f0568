// src/exec/task_runner.rs

//! Runs one scheduled task and reports back to the runtime.

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskOutcome};
use crate::reload::ReloadSignal;
use crate::tasks;
use crate::types::TaskKind;

use super::executor_loop::ExecutorContext;

/// Run `task`, then send exactly one `TaskCompleted` for it.
///
/// On success the task's outputs are recorded for stale-output pruning and,
/// if anything changed on disk, connected browsers are told to reload.
pub async fn run_task(
    task: ScheduledTask,
    ctx: ExecutorContext,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) {
    let previous = ctx.ledger.previous(&task.name);
    let result = tasks::run(task.task.clone(), ctx.tasks.clone(), previous).await;

    let outcome = match result {
        Ok(report) => {
            if task.task.kind() == TaskKind::Clean {
                ctx.ledger.clear();
            } else {
                ctx.ledger.record(&task.name, report.outputs.clone());
            }

            info!(
                task = %task.name,
                run_id = task.run_id,
                outputs = report.outputs.len(),
                written = report.written.len(),
                removed = report.removed.len(),
                "task finished"
            );

            if report.has_changes() {
                ctx.notifier.notify(ReloadSignal::for_changes(&report.changed()));
            }
            TaskOutcome::Success
        }
        Err(err) => {
            error!(task = %task.name, run_id = task.run_id, "task failed: {err:#}");
            TaskOutcome::Failed(err.kind())
        }
    };

    if let Err(err) = runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
    {
        warn!(task = %task.name, "runtime gone; dropping completion: {err}");
    }
}
