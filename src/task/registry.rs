// src/task/registry.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::{AssetflowError, Result};
use crate::fs::FileSystem;
use crate::task::{Task, TaskFn, TaskName, task_fn};
use crate::transform::TransformRunner;

/// Holds tasks by name. Registration order is irrelevant.
#[derive(Debug, Default, Clone)]
pub struct TaskRegistry {
    tasks: BTreeMap<TaskName, Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
        }
    }

    /// Register a task from its parts.
    pub fn register(
        &mut self,
        name: impl Into<TaskName>,
        run: TaskFn,
        inputs: Vec<String>,
        output: impl Into<PathBuf>,
    ) -> Result<()> {
        self.register_task(Task::new(name, run, inputs, output))
    }

    /// Register a fully specified task.
    pub fn register_task(&mut self, task: Task) -> Result<()> {
        if self.tasks.contains_key(&task.name) {
            return Err(AssetflowError::DuplicateTask(task.name));
        }
        debug!(task = %task.name, "registered task");
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&Task> {
        self.tasks
            .get(name)
            .ok_or_else(|| AssetflowError::UnknownTask(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Build a registry whose tasks run the configured transform steps.
    ///
    /// `root` is the project root all task paths are relative to.
    pub fn from_config(
        cfg: &ConfigFile,
        root: &Path,
        fs: Arc<dyn FileSystem>,
    ) -> Result<Self> {
        let mut registry = TaskRegistry::new();

        for (name, tc) in cfg.tasks().iter() {
            let runner = Arc::new(TransformRunner::from_config(
                name,
                tc,
                root.to_path_buf(),
                Arc::clone(&fs),
            )?);

            let run = task_fn(move || {
                let runner = Arc::clone(&runner);
                async move { runner.run().await }
            });

            let task = Task::new(name.clone(), run, tc.inputs.clone(), tc.output.clone())
                .with_reload(tc.reload)
                .with_watch(tc.effective_watch().to_vec());
            registry.register_task(task)?;
        }

        Ok(registry)
    }
}
