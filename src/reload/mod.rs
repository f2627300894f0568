// src/reload/mod.rs

//! Live reload.
//!
//! [`ReloadNotifier`] fans reload signals out to connected browsers;
//! [`server`] serves the output root and streams those signals over SSE.

pub mod notifier;
pub mod server;

pub use notifier::{ReloadNotifier, ReloadSignal};
pub use server::{CLIENT_PATH, EVENTS_PATH, router, spawn_server};
