// src/exec/backend.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::engine::{TaskName, WatchEvent};
use crate::errors::Result;
use crate::pipeline::{PipelineExecutor, PipelineNode};

/// Starts task runs on behalf of the watch runtime.
///
/// An implementation must eventually send `RunStarted` and then
/// `RunFinished` for every run it accepts. Returning from `start_run`
/// does not wait for the run itself.
pub trait RunBackend: Send {
    fn start_run(
        &mut self,
        task: TaskName,
        events: mpsc::Sender<WatchEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Production backend: runs the task through the pipeline executor on a
/// Tokio task, so the task's reload notification fires as in a normal run.
pub struct PipelineRunBackend {
    executor: Arc<PipelineExecutor>,
}

impl PipelineRunBackend {
    pub fn new(executor: Arc<PipelineExecutor>) -> Self {
        Self { executor }
    }
}

impl RunBackend for PipelineRunBackend {
    fn start_run(
        &mut self,
        task: TaskName,
        events: mpsc::Sender<WatchEvent>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let executor = Arc::clone(&self.executor);

        Box::pin(async move {
            tokio::spawn(async move {
                if events
                    .send(WatchEvent::RunStarted { task: task.clone() })
                    .await
                    .is_err()
                {
                    warn!(task = %task, "watch runtime closed; run not started");
                    return;
                }
                let completion = executor.execute(PipelineNode::Task(task.clone())).await;
                if events
                    .send(WatchEvent::RunFinished { task, completion })
                    .await
                    .is_err()
                {
                    warn!("watch runtime closed before run finished");
                }
            });
            Ok(())
        })
    }
}
