// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`executor_loop`] owns the background loop that receives scheduled
//!   tasks and runs each in its own Tokio task, never two invocations of the
//!   same task at once.
//! - [`task_runner`] runs one task, records its outputs, signals live
//!   reload and reports the outcome back to the runtime.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` used in production; tests swap in a fake.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::{ExecutorContext, spawn_executor};
