// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - Compiling each pipeline task's `watch` globs into bindings.
//! - Wiring up a cross-platform filesystem watcher (`notify`) on the source
//!   root.
//! - Turning each change into triggers for exactly the tasks bound to it.
//!
//! It does not know about task ordering; the engine decides when a
//! triggered task actually runs.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use patterns::{WatchBinding, WatchBindings};
pub use watcher::{WatcherHandle, spawn_watcher};
