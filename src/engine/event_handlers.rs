// src/engine/event_handlers.rs

//! Transition functions for the watch core.

use std::collections::BTreeMap;

use tracing::{debug, error, info};

use crate::engine::core::TaskState;
use crate::engine::queue::PendingRuns;
use crate::engine::TaskName;
use crate::task::Completion;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start one run of this task.
    StartRun(TaskName),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn keep(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// A watched file of `task` changed.
///
/// - `Idle`: move to `Triggered` and start a run.
/// - `Triggered` / `Running`: remember one pending re-run.
/// - While stopping, triggers are ignored.
pub fn handle_trigger(
    states: &mut BTreeMap<TaskName, TaskState>,
    pending: &mut PendingRuns,
    stopping: bool,
    task: TaskName,
) -> CoreStep {
    if stopping {
        debug!(task = %task, "ignoring trigger while stopping");
        return CoreStep::keep(Vec::new());
    }

    let state = states.entry(task.clone()).or_insert(TaskState::Idle);
    match state {
        TaskState::Idle => {
            *state = TaskState::Triggered;
            debug!(task = %task, "idle -> triggered");
            CoreStep::keep(vec![CoreCommand::StartRun(task)])
        }
        TaskState::Triggered | TaskState::Running => {
            pending.record(&task);
            CoreStep::keep(Vec::new())
        }
    }
}

/// The backend picked up a run of `task`.
pub fn handle_run_started(states: &mut BTreeMap<TaskName, TaskState>, task: TaskName) -> CoreStep {
    if let Some(state) = states.get_mut(&task) {
        if *state == TaskState::Triggered {
            *state = TaskState::Running;
            debug!(task = %task, "triggered -> running");
        }
    }
    CoreStep::keep(Vec::new())
}

/// A run of `task` finished.
///
/// If a re-run is pending (and we are not stopping) exactly one new run
/// starts; otherwise the task returns to `Idle`. Once stopping and nothing
/// is in flight, the loop may exit.
pub fn handle_run_finished(
    states: &mut BTreeMap<TaskName, TaskState>,
    pending: &mut PendingRuns,
    stopping: bool,
    task: TaskName,
    completion: Completion,
) -> CoreStep {
    match &completion {
        Completion::Success => info!(task = %task, "watch run succeeded"),
        Completion::Failed(failure) => error!(task = %task, "watch run failed: {failure}"),
    }

    let rerun = !stopping && pending.take(&task);
    let next = if rerun {
        TaskState::Triggered
    } else {
        TaskState::Idle
    };
    states.insert(task.clone(), next);

    if rerun {
        debug!(task = %task, "running -> triggered (pending re-run)");
        return CoreStep::keep(vec![CoreCommand::StartRun(task)]);
    }

    debug!(task = %task, "running -> idle");
    CoreStep {
        commands: Vec::new(),
        keep_running: !(stopping && all_idle(states)),
    }
}

/// Stop requested: drop pending re-runs and wait for in-flight runs.
pub fn handle_stop(
    states: &BTreeMap<TaskName, TaskState>,
    pending: &mut PendingRuns,
) -> CoreStep {
    pending.clear();
    let idle = all_idle(states);
    if !idle {
        info!("stop requested; waiting for in-flight runs");
    }
    CoreStep {
        commands: Vec::new(),
        keep_running: !idle,
    }
}

pub(crate) fn all_idle(states: &BTreeMap<TaskName, TaskState>) -> bool {
    states.values().all(|s| *s == TaskState::Idle)
}
