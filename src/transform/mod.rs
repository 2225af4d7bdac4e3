// src/transform/mod.rs

//! File selection and transform steps.
//!
//! - [`selector`] resolves a task's input globs against the filesystem.
//! - [`runner`] drives selected files through the task's steps and writes
//!   the results under the output directory.
//! - The remaining modules implement the built-in steps. Each one is a thin
//!   adapter over an external library or program; the runner only sees the
//!   [`Transform`] / [`Merge`] traits.

pub mod command;
pub mod css;
pub mod html;
pub mod js;
pub mod raster;
pub mod rename;
pub mod runner;
pub mod selector;
pub mod size;
pub mod sourcemap;
pub mod sprite;
pub mod svg;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::model::StepConfig;
use crate::fs::FileSystem;
use crate::task::TaskName;

pub use runner::{RunReport, TransformRunner};
pub use selector::{SelectedFile, Selector};
pub use size::{SizeMetrics, SizeRecord};

/// A file travelling through a task's steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    /// Path relative to the task's output directory.
    pub path: PathBuf,
    pub contents: Vec<u8>,
    /// Absolute path of the file this asset was read from, if it maps to a
    /// single source file.
    pub origin: Option<PathBuf>,
    /// Project-relative paths of every source that contributed content.
    pub sources: Vec<PathBuf>,
    /// Source map (v3 JSON) from the current contents back to the
    /// original sources. Steps that rewrite contents without producing a
    /// map clear it.
    pub map: Option<String>,
}

impl AssetFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            origin: None,
            sources: Vec::new(),
            map: None,
        }
    }

    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.contents)
            .with_context(|| format!("{} is not valid UTF-8", self.path.display()))
    }

    pub fn set_text(&mut self, text: String) {
        self.contents = text.into_bytes();
    }

    /// Replace the contents with output that has no source map.
    pub fn replace_unmapped(&mut self, contents: Vec<u8>) {
        self.contents = contents;
        self.map = None;
    }

    /// Name a map should use for the current contents: the file it was
    /// read from, or its output path.
    pub fn map_source_name(&self) -> String {
        self.origin
            .as_deref()
            .unwrap_or(&self.path)
            .to_string_lossy()
            .into_owned()
    }

    /// Extension of the current path, lowercased, without the dot.
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Directory that relative references inside this file resolve against.
    pub fn origin_dir(&self) -> Option<&Path> {
        self.origin.as_deref().and_then(Path::parent)
    }

    pub fn add_source(&mut self, source: PathBuf) {
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
    }
}

/// Per-run state shared by all steps of one task invocation.
#[derive(Debug)]
pub struct StepContext {
    pub task: TaskName,
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
    pub metrics: SizeMetrics,
}

impl StepContext {
    pub fn new(task: impl Into<TaskName>, root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            task: task.into(),
            root: root.into(),
            fs,
            metrics: SizeMetrics::default(),
        }
    }

    /// `path` relative to the project root, or `path` itself when outside.
    pub fn project_relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

/// A per-file step: one file in, zero or more files out.
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, file: AssetFile, ctx: &StepContext) -> Result<Vec<AssetFile>>;
}

/// A barrier step that sees every file of the stream at once.
pub trait Merge: Send + Sync {
    fn name(&self) -> &'static str;
    fn merge(&self, files: Vec<AssetFile>, ctx: &StepContext) -> Result<Vec<AssetFile>>;
}

pub enum Step {
    Map(Box<dyn Transform>),
    Merge(Box<dyn Merge>),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Map(t) => t.name(),
            Step::Merge(m) => m.name(),
        }
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Step").field(&self.name()).finish()
    }
}

/// Instantiate the built-in step for a config entry.
pub fn build_step(cfg: &StepConfig) -> Result<Step> {
    let step = match cfg {
        StepConfig::CssImport => Step::Map(Box::new(css::CssImport::new())),
        StepConfig::Autoprefix { browsers } => {
            Step::Map(Box::new(css::Autoprefix::from_config(browsers)?))
        }
        StepConfig::MinifyCss { browsers } => {
            Step::Map(Box::new(css::MinifyCss::from_config(browsers)?))
        }
        StepConfig::MinifyJs => Step::Map(Box::new(js::MinifyJs)),
        StepConfig::FileInclude { prefix, basepath } => {
            Step::Map(Box::new(html::FileInclude::new(prefix, basepath.clone())?))
        }
        StepConfig::MinifyHtml => Step::Map(Box::new(html::MinifyHtml::new())),
        StepConfig::Rename {
            prefix,
            suffix,
            basename,
            extname,
        } => Step::Map(Box::new(rename::Rename {
            prefix: prefix.clone(),
            suffix: suffix.clone(),
            basename: basename.clone(),
            extname: extname.clone(),
        })),
        StepConfig::Webp => Step::Map(Box::new(raster::ToWebp)),
        StepConfig::Avif { quality, speed } => Step::Map(Box::new(raster::ToAvif {
            quality: *quality,
            speed: *speed,
        })),
        StepConfig::OptimizeImage { jpeg_quality } => Step::Map(Box::new(raster::OptimizeImage {
            jpeg_quality: *jpeg_quality,
        })),
        StepConfig::SvgSprite { sprite } => Step::Merge(Box::new(sprite::SvgSprite::new(sprite)?)),
        StepConfig::Command {
            program,
            args,
            extname,
        } => Step::Map(Box::new(command::CommandStep {
            program: program.clone(),
            args: args.clone(),
            extname: extname.clone(),
        })),
        StepConfig::Size { title } => Step::Map(Box::new(size::SizeStep {
            title: title.clone(),
        })),
        StepConfig::Sourcemap => Step::Map(Box::new(sourcemap::SourceMapStep)),
    };
    Ok(step)
}

pub fn build_steps(cfgs: &[StepConfig]) -> Result<Vec<Step>> {
    cfgs.iter().map(build_step).collect()
}
