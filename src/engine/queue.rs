// src/engine/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

use super::TaskName;

/// Tasks with a re-run owed once their current run finishes.
///
/// At most one pending re-run is kept per task: recording the same task
/// twice is the same as recording it once.
#[derive(Debug, Default)]
pub struct PendingRuns {
    tasks: BTreeSet<TaskName>,
}

impl PendingRuns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, task: &str) -> bool {
        self.tasks.contains(task)
    }

    /// Record a trigger that arrived while `task` was busy. Returns `false`
    /// when a re-run was already pending.
    pub fn record(&mut self, task: &str) -> bool {
        let inserted = self.tasks.insert(task.to_string());
        debug!(task = %task, inserted, "recorded pending re-run");
        inserted
    }

    /// Consume the pending re-run of `task`, if any.
    pub fn take(&mut self, task: &str) -> bool {
        self.tasks.remove(task)
    }

    /// Drop every pending re-run; returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let n = self.tasks.len();
        self.tasks.clear();
        if n > 0 {
            debug!(discarded = n, "discarded pending re-runs");
        }
        n
    }
}
