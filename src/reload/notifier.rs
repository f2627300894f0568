// src/reload/notifier.rs

use std::path::PathBuf;

use tokio::sync::broadcast;
use tracing::debug;

/// Buffered signals per subscriber before a slow browser starts lagging.
const CHANNEL_CAPACITY: usize = 64;

/// What connected browsers should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadSignal {
    /// Reload the page.
    Reload,
    /// Only stylesheets changed: refresh them in place.
    InjectCss,
}

impl ReloadSignal {
    /// `InjectCss` when every changed path is a stylesheet (or its source
    /// map), `Reload` otherwise.
    pub fn for_changes(paths: &[PathBuf]) -> Self {
        let css_only = !paths.is_empty()
            && paths.iter().all(|p| {
                let name = p.to_string_lossy();
                name.ends_with(".css") || name.ends_with(".css.map")
            });
        if css_only {
            ReloadSignal::InjectCss
        } else {
            ReloadSignal::Reload
        }
    }

    /// SSE event name for this signal.
    pub fn event_name(self) -> &'static str {
        match self {
            ReloadSignal::Reload => "reload",
            ReloadSignal::InjectCss => "css",
        }
    }
}

/// Best-effort broadcast of reload signals.
#[derive(Debug, Clone)]
pub struct ReloadNotifier {
    tx: broadcast::Sender<ReloadSignal>,
}

impl Default for ReloadNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadSignal> {
        self.tx.subscribe()
    }

    /// Send `signal` to every connected browser. Having none is fine.
    pub fn notify(&self, signal: ReloadSignal) {
        match self.tx.send(signal) {
            Ok(receivers) => debug!(?signal, receivers, "reload signal sent"),
            Err(_) => debug!(?signal, "no browsers connected; reload signal dropped"),
        }
    }
}
