// src/pipeline/executor.rs

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::pipeline::PipelineNode;
use crate::reload::Notifier;
use crate::task::{Completion, TaskFailure, TaskRegistry};
use crate::types::{FailurePolicy, ReloadKind};

/// Future returned by [`PipelineExecutor::execute`].
pub type NodeFuture = Pin<Box<dyn Future<Output = Completion> + Send + 'static>>;

/// Runs pipeline trees against a task registry.
///
/// The executor is stateless between runs: executing the same node twice
/// invokes every task again.
pub struct PipelineExecutor {
    registry: Arc<TaskRegistry>,
    policy: FailurePolicy,
    notifier: Option<Arc<dyn Notifier>>,
}

impl std::fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("tasks", &self.registry.len())
            .field("policy", &self.policy)
            .field("notifier", &self.notifier.is_some())
            .finish()
    }
}

impl PipelineExecutor {
    pub fn new(registry: Arc<TaskRegistry>, policy: FailurePolicy) -> Self {
        Self {
            registry,
            policy,
            notifier: None,
        }
    }

    /// Successful task runs are reported to `notifier`.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Execute `node` and resolve to its completion.
    pub fn execute(self: &Arc<Self>, node: PipelineNode) -> NodeFuture {
        let this = Arc::clone(self);
        Box::pin(async move {
            match node {
                PipelineNode::Task(name) => this.run_task(&name).await,
                PipelineNode::Sequence(children) => this.run_sequence(children).await,
                PipelineNode::Parallel(children) => this.run_parallel(children).await,
            }
        })
    }

    /// Run a single task by name, notifying on success.
    pub async fn run_task(&self, name: &str) -> Completion {
        let task = match self.registry.lookup(name) {
            Ok(task) => task.clone(),
            Err(e) => {
                error!(task = %name, "{e}");
                return Completion::Failed(TaskFailure::from_error(name, &e));
            }
        };

        info!(task = %name, "starting task");
        let started = Instant::now();
        let completion = task.run().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &completion {
            Completion::Success => {
                info!(task = %name, elapsed_ms, "finished task");
                self.notify(task.reload, &task.output);
            }
            Completion::Failed(failure) => {
                error!(task = %name, elapsed_ms, "{failure}");
            }
        }
        completion
    }

    async fn run_sequence(self: Arc<Self>, children: Vec<PipelineNode>) -> Completion {
        for child in children {
            let completion = self.execute(child).await;
            if !completion.is_success() {
                return completion;
            }
        }
        Completion::Success
    }

    async fn run_parallel(self: Arc<Self>, children: Vec<PipelineNode>) -> Completion {
        let mut set = JoinSet::new();
        for child in children {
            set.spawn(self.execute(child));
        }

        let mut first_failure: Option<Completion> = None;

        while let Some(joined) = set.join_next().await {
            let completion = match joined {
                Ok(completion) => completion,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => Completion::Failed(TaskFailure::new(
                    "<parallel>",
                    format!("child panicked: {e}"),
                )),
            };

            if completion.is_success() || first_failure.is_some() {
                continue;
            }

            first_failure = Some(completion);
            if self.policy == FailurePolicy::FailFast {
                let remaining = set.len();
                if remaining > 0 {
                    warn!(remaining, "fail-fast: aborting remaining parallel children");
                }
                set.abort_all();
                break;
            }
        }

        first_failure.unwrap_or(Completion::Success)
    }

    fn notify(&self, reload: ReloadKind, output: &std::path::Path) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        match reload {
            ReloadKind::Full => {
                debug!("requesting full reload");
                notifier.notify_reload();
            }
            ReloadKind::Styles => {
                debug!(output = %output.display(), "requesting style update");
                notifier.notify_style_update(&[output.to_path_buf()]);
            }
            ReloadKind::None => {}
        }
    }
}
