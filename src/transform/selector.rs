// src/transform/selector.rs

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::fs::FileSystem;

/// Compiled input patterns of a task.
///
/// Patterns are relative to the project root. A leading `!` turns a pattern
/// into an exclusion; a leading `./` is ignored. `*` does not cross `/`,
/// `**` does.
#[derive(Clone)]
pub struct Selector {
    includes: Vec<IncludePattern>,
    exclude: Option<GlobSet>,
}

#[derive(Clone)]
struct IncludePattern {
    pattern: String,
    /// Literal directory prefix of the pattern; output paths are relative
    /// to it.
    base: PathBuf,
    matcher: GlobMatcher,
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let patterns: Vec<&str> = self.includes.iter().map(|i| i.pattern.as_str()).collect();
        f.debug_struct("Selector")
            .field("includes", &patterns)
            .finish_non_exhaustive()
    }
}

/// A file picked by a [`Selector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Full path (root joined with the project-relative path).
    pub path: PathBuf,
    /// Path relative to the project root.
    pub source: PathBuf,
    /// Path relative to the glob base of the pattern that selected it.
    pub relative: PathBuf,
}

impl Selector {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut includes = Vec::new();
        let mut exclude_builder = GlobSetBuilder::new();
        let mut has_excludes = false;

        for raw in patterns {
            if let Some(negated) = raw.strip_prefix('!') {
                let pattern = normalize_pattern(negated);
                exclude_builder.add(compile_glob(&pattern)?);
                has_excludes = true;
                continue;
            }

            let pattern = normalize_pattern(raw);
            let matcher = compile_glob(&pattern)?.compile_matcher();
            includes.push(IncludePattern {
                base: glob_base(&pattern),
                pattern,
                matcher,
            });
        }

        let exclude = if has_excludes {
            Some(exclude_builder.build().context("building exclude globset")?)
        } else {
            None
        };

        Ok(Self { includes, exclude })
    }

    /// Returns true if the project-relative path (forward slashes) is
    /// selected by these patterns.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.includes.iter().any(|i| i.matcher.is_match(rel_path)) {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !exclude.is_match(rel_path),
            None => true,
        }
    }

    /// Resolve the current set of matching files under `root`.
    ///
    /// Evaluated against the filesystem as it is right now; nothing is
    /// cached between calls. Files come out grouped by pattern in declared
    /// order, sorted within each pattern; a file matched by several
    /// patterns is reported once, for the first.
    pub fn resolve(&self, fs: &dyn FileSystem, root: &Path) -> Result<Vec<SelectedFile>> {
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut selected = Vec::new();

        for include in &self.includes {
            let start = root.join(&include.base);
            let mut candidates = Vec::new();

            if fs.is_file(&start) {
                candidates.push(start);
            } else if fs.is_dir(&start) {
                walk_files(fs, &start, &mut candidates)?;
            } else {
                debug!(pattern = %include.pattern, "glob base does not exist; nothing selected");
                continue;
            }

            candidates.sort();

            for path in candidates {
                let Ok(source) = path.strip_prefix(root) else {
                    continue;
                };
                let rel_str = to_slash(source);
                if !include.matcher.is_match(&rel_str) {
                    continue;
                }
                if let Some(exclude) = &self.exclude {
                    if exclude.is_match(&rel_str) {
                        continue;
                    }
                }
                if !seen.insert(source.to_path_buf()) {
                    continue;
                }

                let relative = source
                    .strip_prefix(&include.base)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| source.to_path_buf());

                selected.push(SelectedFile {
                    source: source.to_path_buf(),
                    relative,
                    path: path.clone(),
                });
            }
        }

        Ok(selected)
    }
}

fn walk_files(fs: &dyn FileSystem, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut stack = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                out.push(path);
            }
        }
    }
    Ok(())
}

fn compile_glob(pattern: &str) -> Result<globset::Glob> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

fn normalize_pattern(pattern: &str) -> String {
    let mut p = pattern.trim();
    while let Some(rest) = p.strip_prefix("./") {
        p = rest;
    }
    p.to_string()
}

/// Leading path components of `pattern` that contain no glob syntax.
///
/// `src/img/**/*.png` -> `src/img`; a fully literal `src/index.pug` -> `src`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let components: Vec<&str> = pattern.split('/').collect();
    let mut base = PathBuf::new();

    for (idx, component) in components.iter().enumerate() {
        let is_last = idx + 1 == components.len();
        if is_last || component.contains(['*', '?', '[', '{']) {
            break;
        }
        if !component.is_empty() {
            base.push(component);
        }
    }

    base
}

/// Path as a forward-slash string, for glob matching.
pub fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
