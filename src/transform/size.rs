// src/transform/size.rs

//! Byte-size metrics for a task run.
//!
//! A `size` step placed before and after a minifier records the aggregate
//! size of everything flowing past it. The totals are a side channel: they
//! are logged and exposed on the run report, never part of `Completion`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::Result;

use super::{AssetFile, StepContext, Transform};

/// Aggregate size recorded by one `size` step during one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeRecord {
    pub title: String,
    pub files: usize,
    pub bytes: u64,
}

#[derive(Debug, Default)]
pub struct SizeMetrics {
    totals: Mutex<BTreeMap<String, (usize, u64)>>,
}

impl SizeMetrics {
    pub fn record(&self, title: &str, bytes: u64) {
        let mut totals = match self.totals.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = totals.entry(title.to_string()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += bytes;
    }

    pub fn snapshot(&self) -> Vec<SizeRecord> {
        let totals = match self.totals.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        totals
            .iter()
            .map(|(title, (files, bytes))| SizeRecord {
                title: title.clone(),
                files: *files,
                bytes: *bytes,
            })
            .collect()
    }
}

pub struct SizeStep {
    pub title: Option<String>,
}

impl Transform for SizeStep {
    fn name(&self) -> &'static str {
        "size"
    }

    fn apply(&self, file: AssetFile, ctx: &StepContext) -> Result<Vec<AssetFile>> {
        let title = self.title.as_deref().unwrap_or("size");
        ctx.metrics.record(title, file.contents.len() as u64);
        Ok(vec![file])
    }
}
