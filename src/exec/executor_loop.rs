// src/exec/executor_loop.rs

//! Main executor loop.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::engine::{RuntimeEvent, TaskName};
use crate::exec::task_runner::run_task;
use crate::reload::ReloadNotifier;
use crate::tasks::{OutputLedger, TaskContext};

/// Shared state every task invocation needs.
#[derive(Debug, Clone)]
pub struct ExecutorContext {
    pub tasks: TaskContext,
    pub ledger: OutputLedger,
    pub notifier: ReloadNotifier,
}

impl ExecutorContext {
    pub fn new(tasks: TaskContext, notifier: ReloadNotifier) -> Self {
        Self {
            tasks,
            ledger: OutputLedger::new(),
            notifier,
        }
    }
}

/// Spawn the background executor loop.
///
/// Each scheduled task runs in its own Tokio task. A task scheduled while a
/// previous invocation of the same task is still running waits for it to
/// finish first, so one task's outputs are never written concurrently.
pub fn spawn_executor(
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    ctx: ExecutorContext,
) -> mpsc::Sender<ScheduledTask> {
    let (tx, mut rx) = mpsc::channel::<ScheduledTask>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<TaskName, JoinHandle<()>> = HashMap::new();

        while let Some(task) = rx.recv().await {
            let previous = active.remove(&task.name).filter(|h| !h.is_finished());
            if previous.is_some() {
                debug!(
                    task = %task.name,
                    run_id = task.run_id,
                    "previous invocation still running; new one will wait for it"
                );
            }

            let name = task.name.clone();
            let rt_tx = runtime_tx.clone();
            let ctx = ctx.clone();
            let handle = tokio::spawn(async move {
                if let Some(previous) = previous {
                    let _ = previous.await;
                }
                run_task(task, ctx, rt_tx).await;
            });
            active.insert(name, handle);
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}
