// src/engine/core.rs

//! Pure watch coordinator state machine.
//!
//! [`WatchCore`] consumes [`WatchEvent`]s and returns the commands the IO
//! shell should perform. It has no channels, no Tokio types and performs no
//! IO, so it can be unit tested directly.

use std::collections::BTreeMap;

use crate::engine::event_handlers::{
    all_idle, handle_run_finished, handle_run_started, handle_stop, handle_trigger, CoreStep,
};
use crate::engine::queue::PendingRuns;
use crate::engine::{TaskName, WatchEvent};

/// Lifecycle of one task inside a watch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    /// A run has been requested but has not started executing yet.
    Triggered,
    Running,
}

#[derive(Debug, Default)]
pub struct WatchCore {
    states: BTreeMap<TaskName, TaskState>,
    pending: PendingRuns,
    stopping: bool,
}

impl WatchCore {
    /// A core that knows `tasks`, all `Idle`. Unknown tasks are added on
    /// first trigger.
    pub fn new<I, S>(tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        Self {
            states: tasks
                .into_iter()
                .map(|t| (t.into(), TaskState::Idle))
                .collect(),
            pending: PendingRuns::new(),
            stopping: false,
        }
    }

    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.states.get(task).copied()
    }

    pub fn has_pending(&self, task: &str) -> bool {
        self.pending.contains(task)
    }

    pub fn is_idle(&self) -> bool {
        all_idle(&self.states)
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn step(&mut self, event: WatchEvent) -> CoreStep {
        match event {
            WatchEvent::Triggered { task } => {
                handle_trigger(&mut self.states, &mut self.pending, self.stopping, task)
            }
            WatchEvent::RunStarted { task } => handle_run_started(&mut self.states, task),
            WatchEvent::RunFinished { task, completion } => handle_run_finished(
                &mut self.states,
                &mut self.pending,
                self.stopping,
                task,
                completion,
            ),
            WatchEvent::StopRequested => {
                self.stopping = true;
                handle_stop(&self.states, &mut self.pending)
            }
        }
    }
}
