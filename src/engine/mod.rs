// src/engine/mod.rs

//! Watch coordinator engine.
//!
//! Per task, the coordinator walks `Idle -> Triggered -> Running -> Idle`.
//! A trigger that arrives while a task is `Triggered` or `Running` is
//! remembered as one pending re-run; any number of such triggers collapse
//! into that single re-run. Different tasks are independent and may run
//! concurrently.
//!
//! The pure state machine lives in [`core`]; the async shell that reads
//! events and starts runs through a [`crate::exec::RunBackend`] is
//! [`runtime`].

use crate::task::Completion;

pub use crate::task::TaskName;

/// Events flowing into the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A watched file of `task` changed (or a manual trigger).
    Triggered { task: TaskName },
    /// The backend began executing a run of `task`.
    RunStarted { task: TaskName },
    /// A run of `task` finished.
    RunFinished {
        task: TaskName,
        completion: Completion,
    },
    /// Stop watching: discard pending re-runs, let in-flight runs finish.
    StopRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runtime;

pub use core::{TaskState, WatchCore};
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::PendingRuns;
pub use runtime::WatchRuntime;
