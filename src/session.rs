// src/session.rs

//! The watch-and-serve half of a development run.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::engine::RuntimeEvent;
use crate::reload::{ReloadNotifier, spawn_server};
use crate::watch::{WatchBindings, WatcherHandle, spawn_watcher};

/// Where and what to serve.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub host: String,
    pub port: u16,
    pub dest: PathBuf,
    pub notifier: ReloadNotifier,
}

/// Everything needed to start watching once the build pass is over.
#[derive(Debug)]
pub struct SessionOptions {
    /// Project root; watch globs are relative to it.
    pub root: PathBuf,
    /// Directory to watch recursively (the source root).
    pub watch_dir: PathBuf,
    pub bindings: WatchBindings,
    pub runtime_tx: mpsc::Sender<RuntimeEvent>,
    pub serve: Option<ServeOptions>,
}

/// A running watcher and, optionally, dev server. Dropping it stops both.
#[derive(Debug)]
pub struct DevSession {
    _watcher: WatcherHandle,
    server: Option<(SocketAddr, JoinHandle<()>)>,
}

impl DevSession {
    pub fn start(options: SessionOptions) -> Result<Self> {
        let watcher = spawn_watcher(
            &options.root,
            &options.watch_dir,
            options.bindings,
            options.runtime_tx,
        )?;

        let server = match options.serve {
            Some(serve) => Some(spawn_server(
                &serve.host,
                serve.port,
                &serve.dest,
                serve.notifier,
            )?),
            None => None,
        };

        info!("watching for changes (Ctrl-C to stop)");
        Ok(Self {
            _watcher: watcher,
            server,
        })
    }

    /// Address the dev server listens on, if serving.
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|(addr, _)| *addr)
    }
}

impl Drop for DevSession {
    fn drop(&mut self) {
        if let Some((_, handle)) = &self.server {
            handle.abort();
        }
    }
}
