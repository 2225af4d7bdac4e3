// src/watch/event_handler.rs

//! Turns one changed path into task triggers.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::WatchEvent;
use crate::fs::FileSystem;
use crate::watch::cache::FileCache;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{matching_tasks, CompiledBinding};

/// Shared state of the event loop.
#[derive(Debug, Clone)]
pub struct ChangeContext {
    pub root: PathBuf,
    pub bindings: Arc<Vec<CompiledBinding>>,
    pub fs: Arc<dyn FileSystem>,
    /// Present when unchanged-content events are skipped.
    pub cache: Option<Arc<Mutex<FileCache>>>,
}

/// Process a single changed path.
///
/// 1. Relativize it against the watch root.
/// 2. Find every task whose binding matches.
/// 3. If content hashing is on, drop the event when the bytes did not change.
/// 4. Send one `Triggered` per matching task.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(
    ctx: &ChangeContext,
    path: &Path,
    runtime_tx: &mpsc::Sender<WatchEvent>,
) -> bool {
    let Some(rel) = relative_str(&ctx.root, path) else {
        debug!(?path, "event outside watch root; ignored");
        return true;
    };

    let tasks: Vec<String> = matching_tasks(&ctx.bindings, &rel)
        .into_iter()
        .map(str::to_string)
        .collect();
    if tasks.is_empty() {
        return true;
    }

    if let Some(cache) = &ctx.cache {
        let cache = Arc::clone(cache);
        let fs = Arc::clone(&ctx.fs);
        let path = path.to_path_buf();
        let changed = tokio::task::spawn_blocking(move || {
            let mut guard = match cache.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.has_changed(fs.as_ref(), &path)
        })
        .await
        .unwrap_or(true);

        if !changed {
            debug!(rel = %rel, "content unchanged; not triggering");
            return true;
        }
    }

    for task in tasks {
        debug!(task = %task, path = %rel, "watch match -> triggering task");
        if let Err(err) = runtime_tx.send(WatchEvent::Triggered { task }).await {
            warn!("failed to forward trigger: {err}");
            return false;
        }
    }
    true
}
