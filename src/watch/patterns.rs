// src/watch/patterns.rs

use std::fmt;

use crate::errors::{AssetflowError, Result};
use crate::task::{TaskName, TaskRegistry};
use crate::transform::Selector;

/// "When a file matching `patterns` changes, run `task`."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    pub patterns: Vec<String>,
    pub task: TaskName,
}

impl WatchBinding {
    pub fn new(task: impl Into<TaskName>, patterns: Vec<String>) -> Self {
        Self {
            patterns,
            task: task.into(),
        }
    }
}

/// A binding with its patterns compiled.
#[derive(Clone)]
pub struct CompiledBinding {
    task: TaskName,
    selector: Selector,
}

impl fmt::Debug for CompiledBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledBinding")
            .field("task", &self.task)
            .field("selector", &self.selector)
            .finish()
    }
}

impl CompiledBinding {
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// `rel_path` is relative to the watch root, forward slashes.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.selector.matches(rel_path)
    }
}

/// Compile every binding; an invalid pattern fails with `WatchSetup`.
pub fn compile_bindings(bindings: &[WatchBinding]) -> Result<Vec<CompiledBinding>> {
    bindings
        .iter()
        .map(|b| {
            let selector = Selector::new(&b.patterns).map_err(|e| {
                AssetflowError::WatchSetup(format!(
                    "invalid watch pattern for task '{}': {e:#}",
                    b.task
                ))
            })?;
            Ok(CompiledBinding {
                task: b.task.clone(),
                selector,
            })
        })
        .collect()
}

/// Bindings for `tasks`, from each task's watch patterns. Tasks with no
/// watch patterns get no binding.
pub fn bindings_for_tasks<'a, I>(registry: &TaskRegistry, tasks: I) -> Result<Vec<WatchBinding>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut bindings = Vec::new();
    for name in tasks {
        let task = registry.lookup(name)?;
        if task.watch.is_empty() {
            continue;
        }
        bindings.push(WatchBinding::new(name, task.watch.clone()));
    }
    Ok(bindings)
}

/// Tasks whose bindings match `rel_path`, deduplicated, in binding order.
pub fn matching_tasks<'a>(bindings: &'a [CompiledBinding], rel_path: &str) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for binding in bindings {
        if binding.matches(rel_path) && !out.contains(&binding.task()) {
            out.push(binding.task());
        }
    }
    out
}
