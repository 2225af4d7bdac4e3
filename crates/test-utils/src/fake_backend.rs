use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Notify};

use assetflow::engine::{TaskName, WatchEvent};
use assetflow::errors::Result;
use assetflow::exec::RunBackend;
use assetflow::task::Completion;

/// A fake run backend that:
/// - records which tasks were started
/// - reports `RunStarted` immediately
/// - reports `RunFinished(Success)` either immediately, or once the test
///   calls [`FakeBackend::release`] when built with [`FakeBackend::gated`].
#[derive(Clone)]
pub struct FakeBackend {
    started: Arc<Mutex<Vec<TaskName>>>,
    gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    /// Runs finish as soon as they start.
    pub fn immediate() -> Self {
        Self {
            started: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    /// Runs stay in flight until released.
    pub fn gated() -> Self {
        Self {
            started: Arc::new(Mutex::new(Vec::new())),
            gate: Some(Arc::new(Notify::new())),
        }
    }

    pub fn started(&self) -> Vec<TaskName> {
        self.started.lock().unwrap().clone()
    }

    pub fn runs_of(&self, task: &str) -> usize {
        self.started().iter().filter(|t| t.as_str() == task).count()
    }

    /// Let one held run finish.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }
}

impl RunBackend for FakeBackend {
    fn start_run(
        &mut self,
        task: TaskName,
        events: mpsc::Sender<WatchEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.started.lock().unwrap().push(task.clone());
        let gate = self.gate.clone();

        Box::pin(async move {
            tokio::spawn(async move {
                let _ = events.send(WatchEvent::RunStarted { task: task.clone() }).await;
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                let _ = events
                    .send(WatchEvent::RunFinished {
                        task,
                        completion: Completion::Success,
                    })
                    .await;
            });
            Ok(())
        })
    }
}
