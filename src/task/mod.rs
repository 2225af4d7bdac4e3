// src/task/mod.rs

//! Tasks: named, parameterless units of work with a declared file scope.
//!
//! - [`registry`] holds registered tasks by name.
//! - [`Completion`] is what running a task produces; the composition engine
//!   uses it to decide whether a sequence proceeds.

pub mod registry;

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::AssetflowError;
use crate::types::ReloadKind;

pub use registry::TaskRegistry;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Future returned by a task's run function.
pub type TaskFuture = Pin<Box<dyn Future<Output = Completion> + Send>>;

/// A task's run function. Called once per execution.
pub type TaskFn = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// Why a task run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: TaskName,
    /// The file being processed when the failure happened, if any.
    pub file: Option<PathBuf>,
    pub message: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "task '{}' failed on {}: {}", self.task, file.display(), self.message),
            None => write!(f, "task '{}' failed: {}", self.task, self.message),
        }
    }
}

impl TaskFailure {
    pub fn new(task: impl Into<TaskName>, message: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            file: None,
            message: message.into(),
        }
    }

    /// Build a failure attributed to `task` from a crate error.
    pub fn from_error(task: &str, err: &AssetflowError) -> Self {
        let file = match err {
            AssetflowError::Transform { file, .. } => file.clone(),
            _ => None,
        };
        Self {
            task: task.to_string(),
            file,
            message: err.to_string(),
        }
    }
}

/// Result of running a task or a pipeline node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Success,
    Failed(TaskFailure),
}

impl Completion {
    pub fn is_success(&self) -> bool {
        matches!(self, Completion::Success)
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            Completion::Success => None,
            Completion::Failed(f) => Some(f),
        }
    }
}

/// A registered task. Immutable once registered.
#[derive(Clone)]
pub struct Task {
    pub name: TaskName,
    pub run: TaskFn,
    /// Declared input glob patterns.
    pub inputs: Vec<String>,
    /// Declared output directory.
    pub output: PathBuf,
    pub reload: ReloadKind,
    /// Patterns whose changes re-run this task in watch mode.
    pub watch: Vec<String>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl Task {
    /// A task that watches its own inputs and requests a full reload.
    pub fn new(
        name: impl Into<TaskName>,
        run: TaskFn,
        inputs: Vec<String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        let watch = inputs.clone();
        Self {
            name: name.into(),
            run,
            inputs,
            output: output.into(),
            reload: ReloadKind::default(),
            watch,
        }
    }

    pub fn with_reload(mut self, reload: ReloadKind) -> Self {
        self.reload = reload;
        self
    }

    pub fn with_watch(mut self, watch: Vec<String>) -> Self {
        self.watch = watch;
        self
    }

    /// Invoke the run function.
    pub fn run(&self) -> TaskFuture {
        (self.run)()
    }
}

/// Wrap an async closure as a [`TaskFn`].
pub fn task_fn<F, Fut>(f: F) -> TaskFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Completion> + Send + 'static,
{
    Arc::new(move || Box::pin(f()) as TaskFuture)
}
