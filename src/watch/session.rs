// src/watch/session.rs

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{WatchCore, WatchEvent, WatchRuntime};
use crate::errors::{AssetflowError, Result};
use crate::exec::RunBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::task::TaskName;
use crate::watch::cache::FileCache;
use crate::watch::event_handler::{process_file_change, ChangeContext};
use crate::watch::patterns::{compile_bindings, CompiledBinding, WatchBinding};
use crate::watch::watcher::{spawn_watcher, WatcherHandle};

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Drop events whose file content hash did not change.
    pub skip_unchanged: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            skip_unchanged: true,
        }
    }
}

/// A running watch session. Bindings live exactly as long as the session.
#[derive(Debug)]
pub struct WatchSession {
    root: PathBuf,
    events: mpsc::Sender<WatchEvent>,
    watcher: Option<WatcherHandle>,
    forwarder: JoinHandle<()>,
    runtime: JoinHandle<Result<WatchCore>>,
}

/// Start watching `root` and running bound tasks through `backend`.
///
/// Fails with `WatchSetup` if a pattern does not compile or the filesystem
/// watcher cannot be started.
pub async fn start_watch<B>(
    root: &Path,
    bindings: &[WatchBinding],
    backend: B,
    options: WatchOptions,
) -> Result<WatchSession>
where
    B: RunBackend + 'static,
{
    let compiled = compile_bindings(bindings)?;
    let root = root.canonicalize().map_err(|e| {
        AssetflowError::WatchSetup(format!("resolving watch root {}: {e}", root.display()))
    })?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let cache = if options.skip_unchanged {
        Some(seed_cache(Arc::clone(&fs), root.clone(), compiled.clone()).await)
    } else {
        None
    };

    let (watcher, mut changes) = spawn_watcher(&root)?;

    let tasks: Vec<TaskName> = compiled.iter().map(|b| b.task().to_string()).collect();
    let (tx, rx) = mpsc::channel::<WatchEvent>(256);
    let runtime = WatchRuntime::new(WatchCore::new(tasks), rx, tx.clone(), backend);
    let runtime = tokio::spawn(runtime.run());

    let ctx = ChangeContext {
        root: root.clone(),
        bindings: Arc::new(compiled),
        fs,
        cache,
    };
    let forward_tx = tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(path) = changes.recv().await {
            if !process_file_change(&ctx, &path, &forward_tx).await {
                break;
            }
        }
        debug!("watch event loop finished");
    });

    info!(root = %root.display(), bindings = bindings.len(), "watch session started");

    Ok(WatchSession {
        root,
        events: tx,
        watcher: Some(watcher),
        forwarder,
        runtime,
    })
}

/// Hash every currently bound file so the first save of an unchanged file
/// is not mistaken for an edit.
async fn seed_cache(
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    bindings: Vec<CompiledBinding>,
) -> Arc<Mutex<FileCache>> {
    let seeded = tokio::task::spawn_blocking(move || {
        let mut cache = FileCache::new();
        for binding in &bindings {
            match binding.selector().resolve(fs.as_ref(), &root) {
                Ok(files) => {
                    for file in files {
                        cache.seed(fs.as_ref(), &file.path);
                    }
                }
                Err(e) => warn!(task = %binding.task(), "could not seed hash cache: {e:#}"),
            }
        }
        debug!(files = cache.len(), "seeded hash cache");
        cache
    })
    .await
    .unwrap_or_default();

    Arc::new(Mutex::new(seeded))
}

impl WatchSession {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Trigger `task` as if one of its watched files changed.
    pub async fn trigger(&self, task: impl Into<TaskName>) -> Result<()> {
        self.events
            .send(WatchEvent::Triggered { task: task.into() })
            .await
            .map_err(|e| AssetflowError::Other(anyhow::anyhow!("watch session closed: {e}")))
    }

    /// Stop watching. Pending re-runs are discarded; runs already in
    /// flight finish before this returns.
    pub async fn stop(mut self) -> Result<()> {
        // No new filesystem events from here on.
        drop(self.watcher.take());
        self.forwarder.abort();

        if self.events.send(WatchEvent::StopRequested).await.is_err() {
            debug!("watch runtime already gone");
        }

        match self.runtime.await {
            Ok(result) => {
                result?;
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                return Err(AssetflowError::Other(anyhow::anyhow!(
                    "watch runtime panicked: {e}"
                )))
            }
        }
        info!("watch session stopped");
        Ok(())
    }
}
