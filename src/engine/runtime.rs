// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::RunBackend;

use super::core::WatchCore;
use super::{CoreCommand, WatchEvent};

/// Async shell around [`WatchCore`]: reads events, feeds the core and
/// starts the runs it asks for.
pub struct WatchRuntime<B: RunBackend> {
    core: WatchCore,
    event_rx: mpsc::Receiver<WatchEvent>,
    /// Handed to the backend so runs can report back.
    event_tx: mpsc::Sender<WatchEvent>,
    backend: B,
}

impl<B: RunBackend> fmt::Debug for WatchRuntime<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRuntime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<B: RunBackend> WatchRuntime<B> {
    pub fn new(
        core: WatchCore,
        event_rx: mpsc::Receiver<WatchEvent>,
        event_tx: mpsc::Sender<WatchEvent>,
        backend: B,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            backend,
        }
    }

    /// Main event loop. Returns once a stop was requested and every
    /// in-flight run has finished.
    pub async fn run(mut self) -> Result<WatchCore> {
        info!("watch runtime started");

        while let Some(event) = self.event_rx.recv().await {
            debug!(?event, "watch runtime received event");

            let step = self.core.step(event);
            for command in step.commands {
                match command {
                    CoreCommand::StartRun(task) => {
                        debug!(task = %task, "starting run");
                        self.backend
                            .start_run(task, self.event_tx.clone())
                            .await?;
                    }
                }
            }

            if !step.keep_running {
                info!("watch runtime stopping");
                break;
            }
        }

        Ok(self.core)
    }
}
