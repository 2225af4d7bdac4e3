// src/cleanup.rs

use std::path::Path;

use tracing::{debug, info};

use crate::errors::{AssetflowError, Result};
use crate::fs::FileSystem;

/// Delete everything under `output_root`, keeping the directory itself.
///
/// A missing root is not an error. A root that exists but is not a
/// directory, or any entry that cannot be removed, fails the cleanup.
pub fn clean(fs: &dyn FileSystem, project_root: &Path, output_root: &Path) -> Result<usize> {
    let root = project_root.join(output_root);

    if !fs.exists(&root) {
        debug!(root = %root.display(), "output root does not exist; nothing to clean");
        return Ok(0);
    }

    if !fs.is_dir(&root) {
        return Err(AssetflowError::Cleanup {
            path: root,
            cause: "not a directory".to_string(),
        });
    }

    let entries = fs.read_dir(&root).map_err(|e| AssetflowError::Cleanup {
        path: root.clone(),
        cause: format!("{e:#}"),
    })?;

    let mut removed = 0;
    for entry in entries {
        let result = if fs.is_dir(&entry) {
            fs.remove_dir_all(&entry)
        } else {
            fs.remove_file(&entry)
        };
        result.map_err(|e| AssetflowError::Cleanup {
            path: entry.clone(),
            cause: format!("{e:#}"),
        })?;
        debug!(path = %entry.display(), "removed");
        removed += 1;
    }

    info!(root = %root.display(), removed, "cleaned output root");
    Ok(removed)
}
