// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::ScheduledTask;
use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::session::DevSession;

use super::core::{CoreRuntime, RunReport};
use super::{CoreCommand, RuntimeEvent};

/// Starts the watch/serve session once the build pass is over.
pub type SessionLauncher = Box<dyn FnOnce() -> anyhow::Result<DevSession> + Send>;

/// IO shell around [`CoreRuntime`]: reads events from the channel, feeds
/// them to the core and carries out the resulting commands.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreRuntime,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    launcher: Option<SessionLauncher>,
    session: Option<DevSession>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreRuntime, event_rx: mpsc::Receiver<RuntimeEvent>, executor: E) -> Self {
        Self {
            core,
            event_rx,
            executor,
            launcher: None,
            session: None,
        }
    }

    /// Run `launcher` when the core asks to start watching.
    pub fn with_launcher(mut self, launcher: SessionLauncher) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Main event loop. Returns what happened once the core asks to stop,
    /// shutdown is requested, or every sender is gone.
    pub async fn run(mut self) -> Result<RunReport> {
        info!("assetdag runtime started");

        loop {
            let Some(event) = self.event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                break;
            };

            debug!(?event, "runtime received event");
            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        // Stop watching and serving before reporting.
        self.session = None;
        info!("runtime exiting");
        Ok(self.core.into_report())
    }

    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => self.spawn_ready(tasks).await?,
            CoreCommand::StartWatching => {
                if let Some(launcher) = self.launcher.take() {
                    self.session = Some(launcher()?);
                } else {
                    debug!("no session launcher configured; not watching");
                }
            }
            CoreCommand::RequestExit => {
                // keep_running is already false for this step.
                debug!("core issued RequestExit command");
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, run_id = tasks[0].run_id, "dispatching ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
