use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use assetdag::dag::ScheduledTask;
use assetdag::engine::{RuntimeEvent, TaskOutcome};
use assetdag::errors::Result;
use assetdag::exec::ExecutorBackend;
use assetdag::types::FailureKind;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were "run"
/// - immediately reports TaskCompleted for each scheduled task, failing the
///   ones named in `failing`, and the ones named in `failing_first` on their
///   first run only.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    failing: BTreeSet<String>,
    failing_first: Arc<Mutex<BTreeSet<String>>>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: BTreeSet::new(),
            failing_first: Arc::default(),
        }
    }

    /// Report these tasks as failed every time they run.
    pub fn failing(mut self, tasks: &[&str]) -> Self {
        self.failing = tasks.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Report these tasks as failed the first time they run, then succeed.
    pub fn failing_first(self, tasks: &[&str]) -> Self {
        *self.failing_first.lock().unwrap() = tasks.iter().map(|t| t.to_string()).collect();
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);
        let failing = self.failing.clone();
        let failing_first = Arc::clone(&self.failing_first);

        Box::pin(async move {
            for t in tasks {
                {
                    let mut guard = executed.lock().unwrap();
                    guard.push(t.name.clone());
                }

                let first_failure = failing_first.lock().unwrap().remove(&t.name);
                let outcome = if first_failure || failing.contains(&t.name) {
                    TaskOutcome::Failed(FailureKind::Transform)
                } else {
                    TaskOutcome::Success
                };

                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    outcome,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
