// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::fs::FileSystem;
use crate::watch::hash::compute_file_hash;

/// Last seen content hash per file.
///
/// Used to drop filesystem events that did not change a file's bytes
/// (editors that rewrite on save, `touch`, metadata-only changes).
#[derive(Debug, Default)]
pub struct FileCache {
    hashes: HashMap<PathBuf, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self {
            hashes: HashMap::new(),
        }
    }

    /// Remember the current hash of `path` without reporting a change.
    pub fn seed(&mut self, fs: &dyn FileSystem, path: &Path) {
        if let Ok(hash) = compute_file_hash(fs, path) {
            self.hashes.insert(path.to_path_buf(), hash);
        }
    }

    /// Record the current content of `path` and report whether it differs
    /// from what was last seen. Unknown, unreadable or deleted files count
    /// as changed.
    pub fn has_changed(&mut self, fs: &dyn FileSystem, path: &Path) -> bool {
        if !fs.is_file(path) {
            let was_known = self.hashes.remove(path).is_some();
            debug!(?path, was_known, "file gone; treating as changed");
            return true;
        }

        let hash = match compute_file_hash(fs, path) {
            Ok(h) => h,
            Err(e) => {
                debug!(?path, "hashing failed ({e:#}); treating as changed");
                self.hashes.remove(path);
                return true;
            }
        };

        match self.hashes.insert(path.to_path_buf(), hash.clone()) {
            Some(previous) if previous == hash => {
                debug!(?path, "content unchanged");
                false
            }
            _ => true,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.hashes.len()
    }
}
