// src/tasks/output.rs

//! Output bookkeeping: change detection and pruning of stale outputs.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing::debug;

use crate::engine::TaskName;
use crate::fs::FileSystem;

use super::TaskReport;

/// Write `contents` to `path` unless the file already holds identical bytes.
///
/// Returns whether the file was written.
pub fn write_if_changed(fs: &dyn FileSystem, path: &Path, contents: &[u8]) -> Result<bool> {
    if fs.is_file(path) {
        let existing = fs.read(path)?;
        if blake3::hash(&existing) == blake3::hash(contents) {
            debug!(path = ?path, "output unchanged");
            return Ok(false);
        }
    }
    fs.write(path, contents)?;
    Ok(true)
}

/// Remove outputs a previous run produced that this run no longer does.
///
/// `report.outputs` is the complete set the task produced this time;
/// anything in `previous` outside it is deleted and appended to
/// `report.removed`.
pub fn prune_stale(
    fs: &dyn FileSystem,
    mut report: TaskReport,
    previous: &[PathBuf],
) -> Result<TaskReport> {
    let current: BTreeSet<&PathBuf> = report.outputs.iter().collect();
    let stale: Vec<PathBuf> = previous
        .iter()
        .filter(|p| !current.contains(p))
        .cloned()
        .collect();

    for path in stale {
        if fs.is_file(&path) {
            fs.remove_file(&path)?;
            debug!(path = ?path, "removed stale output");
            report.removed.push(path);
        }
    }
    Ok(report)
}

/// Outputs each task produced on its last successful run.
///
/// Shared between concurrent task invocations; a task's entry is only
/// touched by that task, and invocations of one task never overlap.
#[derive(Debug, Clone, Default)]
pub struct OutputLedger {
    inner: Arc<Mutex<HashMap<TaskName, Vec<PathBuf>>>>,
}

impl OutputLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self, task: &str) -> Vec<PathBuf> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(task)
            .cloned()
            .unwrap_or_default()
    }

    pub fn record(&self, task: &str, outputs: Vec<PathBuf>) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(task.to_string(), outputs);
    }

    /// Forget everything, e.g. after a clean wiped the output root.
    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}
