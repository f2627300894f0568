// src/watch/watcher.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::event_handler::process_event;
use crate::watch::patterns::WatchBindings;

/// Keeps the filesystem watcher alive. Dropping it stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    forwarder: JoinHandle<()>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish_non_exhaustive()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Watch `watch_dir` recursively and send `RuntimeEvent::TaskTriggered` for
/// every task bound to a changed path.
///
/// Watch globs are evaluated relative to `root` (the project root), so
/// `watch_dir` must lie inside it.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    watch_dir: impl Into<PathBuf>,
    bindings: WatchBindings,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or(root);
    let watch_dir = watch_dir.into();
    let watch_dir = watch_dir
        .canonicalize()
        .with_context(|| format!("resolving watch directory {:?}", watch_dir))?;

    // Bridge from notify's callback thread into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    warn!("failed to forward notify event: {err}");
                }
            }
            Err(err) => warn!("file watch error: {err}"),
        },
        Config::default(),
    )?;

    watcher
        .watch(&watch_dir, RecursiveMode::Recursive)
        .with_context(|| format!("watching {:?}", watch_dir))?;

    info!(dir = ?watch_dir, bindings = bindings.iter().count(), "file watcher started");

    let bindings = Arc::new(bindings);
    let forwarder = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "received notify event");
            if !process_event(&root, &event, &bindings, &runtime_tx).await {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle {
        _inner: watcher,
        forwarder,
    })
}
