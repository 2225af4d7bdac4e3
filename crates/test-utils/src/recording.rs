use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetflow::reload::Notifier;
use assetflow::task::{task_fn, Completion, Task, TaskFailure};

/// Shared, ordered log of `start:<task>` / `end:<task>` entries.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Tasks in the order they started.
    pub fn started(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix("start:").map(str::to_string))
            .collect()
    }

    /// Tasks in the order they finished.
    pub fn finished(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter_map(|e| e.strip_prefix("end:").map(str::to_string))
            .collect()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

/// How a recording task behaves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Behaviour {
    pub delay: Duration,
    pub fail: bool,
}

impl Behaviour {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn delayed(ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            ..Self::default()
        }
    }

    pub fn and_fail(mut self) -> Self {
        self.fail = true;
        self
    }
}

/// A task that logs its start and end to `log`, sleeping and failing as
/// `behaviour` says. `end:` is only logged if the run was not aborted.
pub fn recording_task(log: &CallLog, name: &str, behaviour: Behaviour) -> Task {
    let log = log.clone();
    let task_name = name.to_string();
    let run = task_fn(move || {
        let log = log.clone();
        let name = task_name.clone();
        async move {
            log.push(format!("start:{name}"));
            if !behaviour.delay.is_zero() {
                tokio::time::sleep(behaviour.delay).await;
            }
            log.push(format!("end:{name}"));
            if behaviour.fail {
                Completion::Failed(TaskFailure::new(name, "boom"))
            } else {
                Completion::Success
            }
        }
    });
    Task::new(name, run, vec![format!("src/{name}/**")], format!("dist/{name}"))
}

/// What a [`RecordingNotifier`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Reload,
    Styles(Vec<PathBuf>),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    calls: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Notification> {
        self.calls.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_reload(&self) {
        self.calls.lock().unwrap().push(Notification::Reload);
    }

    fn notify_style_update(&self, outputs: &[PathBuf]) {
        self.calls
            .lock()
            .unwrap()
            .push(Notification::Styles(outputs.to_vec()));
    }
}
