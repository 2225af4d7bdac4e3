// src/watch/path_utils.rs

use std::path::Path;

use crate::transform::selector::to_slash;

/// `path` relative to `root`, with forward slashes.
///
/// Falls back to comparing canonical paths, since some platforms report
/// events under a different absolute prefix for the same directory
/// (`/private/var` vs `/var` on macOS).
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    if let Ok(rel) = path.strip_prefix(&root_canon) {
        return Some(to_slash(rel));
    }

    // Deleted files cannot be canonicalized; their parent usually can.
    let parent = path.parent()?.canonicalize().ok()?;
    let rel_parent = parent.strip_prefix(&root_canon).ok()?;
    let name = path.file_name()?;
    Some(to_slash(&rel_parent.join(name)))
}
