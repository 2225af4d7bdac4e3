// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

use crate::task::TaskName;

#[derive(Error, Debug)]
pub enum AssetflowError {
    #[error("Task already registered: {0}")]
    DuplicateTask(TaskName),

    #[error("Task not found: {0}")]
    UnknownTask(TaskName),

    #[error("Task '{task}': step '{step}' failed{}: {cause}", file_suffix(.file))]
    Transform {
        task: TaskName,
        step: String,
        file: Option<PathBuf>,
        cause: String,
    },

    #[error("Cleanup of {path:?} failed: {cause}")]
    Cleanup { path: PathBuf, cause: String },

    #[error("Watch setup failed: {0}")]
    WatchSetup(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in pipelines: {0}")]
    PipelineCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn file_suffix(file: &Option<PathBuf>) -> String {
    match file {
        Some(path) => format!(" on {}", path.display()),
        None => String::new(),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetflowError>;
