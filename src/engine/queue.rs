// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use super::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrive for tasks already part of the active run.
///
/// Each entry is a batch of task names for a future run. `max_runs` bounds
/// how many batches are kept (default 1: at most one follow-up run). When
/// the scheduler goes idle, every batch is merged into one new run.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Remember a trigger for a future run.
    ///
    /// - `Queue`: merge into the newest batch, dropping the oldest batches
    ///   beyond `max_runs`.
    /// - `Cancel`: replace everything queued with this task alone.
    pub fn record_trigger(&mut self, task: &str) {
        let name = task.to_string();

        match self.behaviour {
            TriggerWhileRunningBehaviour::Queue => {
                if let Some(last_batch) = self.runs.back_mut() {
                    let inserted = last_batch.insert(name.clone());
                    debug!(task = %name, inserted, "merged trigger into queued batch");
                } else {
                    self.runs.push_back(BTreeSet::from([name.clone()]));
                    debug!(task = %name, "queued trigger for the next run");
                }

                if self.runs.len() > self.max_runs {
                    warn!(
                        current_batches = self.runs.len(),
                        max_runs = self.max_runs,
                        "exceeded queue_length; dropping oldest queued batches"
                    );
                    while self.runs.len() > self.max_runs {
                        self.runs.pop_front();
                    }
                }
            }
            TriggerWhileRunningBehaviour::Cancel => {
                debug!(task = %name, "replacing queued triggers (cancel mode)");
                self.runs.clear();
                self.runs.push_back(BTreeSet::from([name]));
            }
        }
    }

    /// Merge every queued batch into one sorted list of task names.
    pub fn drain_pending(&mut self) -> Vec<TaskName> {
        let mut merged: BTreeSet<TaskName> = BTreeSet::new();
        while let Some(batch) = self.runs.pop_front() {
            merged.extend(batch);
        }
        if !merged.is_empty() {
            debug!(drained = merged.len(), "drained queued triggers into new run");
        }
        merged.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_mode_coalesces_into_one_batch() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 1);
        q.record_trigger("styles");
        q.record_trigger("markup");
        q.record_trigger("styles");
        assert_eq!(q.drain_pending(), vec!["markup", "styles"]);
        assert!(q.is_empty());
    }

    #[test]
    fn cancel_mode_keeps_latest_only() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 3);
        q.record_trigger("styles");
        q.record_trigger("markup");
        assert_eq!(q.drain_pending(), vec!["markup"]);
    }

    #[test]
    fn zero_length_is_clamped() {
        let mut q = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 0);
        q.record_trigger("a");
        assert!(!q.is_empty());
        assert_eq!(q.behaviour(), TriggerWhileRunningBehaviour::Queue);
    }
}
