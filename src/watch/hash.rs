// src/watch/hash.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::fs::FileSystem;

/// blake3 digest of a file's contents, hex encoded.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs.read(path)?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Digest of every file under `dir`, keyed by path relative to `dir`.
///
/// Two trees are byte-identical exactly when their digests are equal.
pub fn hash_tree(fs: &dyn FileSystem, dir: &Path) -> Result<BTreeMap<PathBuf, String>> {
    let mut out = BTreeMap::new();
    if !fs.is_dir(dir) {
        return Ok(out);
    }

    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs.read_dir(&current)? {
            if fs.is_dir(&entry) {
                stack.push(entry);
            } else if fs.is_file(&entry) {
                let rel = entry.strip_prefix(dir).unwrap_or(&entry).to_path_buf();
                let hash = compute_file_hash(fs, &entry)?;
                out.insert(rel, hash);
            }
        }
    }
    Ok(out)
}
