// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::info;

use crate::errors::{AssetflowError, Result};

/// Keeps the underlying `notify` watcher alive. Dropping it stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

fn is_content_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    )
}

/// Watch `root` recursively and forward changed paths.
///
/// notify calls back on its own thread; paths are handed to async code
/// through an unbounded channel.
pub fn spawn_watcher(root: &Path) -> Result<(WatcherHandle, mpsc::UnboundedReceiver<PathBuf>)> {
    let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_content_event(&event.kind) {
                    return;
                }
                for path in event.paths {
                    // Receiver gone means the session is stopping.
                    let _ = tx.send(path);
                }
            }
            Err(err) => {
                tracing::warn!("file watch error: {err}");
            }
        },
        Config::default(),
    )
    .map_err(|e| AssetflowError::WatchSetup(format!("creating watcher: {e}")))?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| AssetflowError::WatchSetup(format!("watching {}: {e}", root.display())))?;

    info!(root = %root.display(), "file watcher started");
    Ok((WatcherHandle { _inner: watcher }, rx))
}
