// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{FailurePolicy, ReloadKind};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// output_root = "dist"
/// failure_policy = "wait_for_all"
///
/// [server]
/// port = 3000
///
/// [task.styles]
/// inputs = ["src/css/**/*.css"]
/// output = "dist/css"
/// reload = "styles"
/// steps = [
///   { kind = "css_import" },
///   { kind = "minify_css" },
///   { kind = "rename", suffix = ".min", extname = ".css" },
/// ]
///
/// [pipeline.build]
/// clean = true
/// run = [{ parallel = ["images", "fonts"] }, "styles"]
/// ```
///
/// This is the unvalidated shape; [`ConfigFile`] is only obtainable through
/// `TryFrom<RawConfigFile>`, which runs validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub server: ServerSection,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// All pipelines from `[pipeline.<name>]`.
    #[serde(default)]
    pub pipeline: BTreeMap<String, PipelineConfig>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub server: ServerSection,
    pub task: BTreeMap<String, TaskConfig>,
    pub pipeline: BTreeMap<String, PipelineConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            server: raw.server,
            task: raw.task,
            pipeline: raw.pipeline,
        }
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn pipelines(&self) -> &BTreeMap<String, PipelineConfig> {
        &self.pipeline
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Directory removed by `clean` before full pipeline runs.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Behaviour of `parallel` nodes when a child fails.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// In watch mode, ignore filesystem events whose file content hash did
    /// not change since the last event for that file.
    #[serde(default = "default_true")]
    pub skip_unchanged: bool,
}

fn default_output_root() -> PathBuf {
    PathBuf::from("dist")
}

fn default_true() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            output_root: default_output_root(),
            failure_policy: FailurePolicy::default(),
            skip_unchanged: true,
        }
    }
}

/// `[server]` section: the dev server started by pipelines with `serve = true`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_reload_port")]
    pub reload_port: u16,

    /// Directory served over HTTP; defaults to `config.output_root`.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_reload_port() -> u16 {
    35729
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            reload_port: default_reload_port(),
            root: None,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Input glob patterns, relative to the project root. `!` excludes.
    pub inputs: Vec<String>,

    /// Output directory, relative to the project root.
    pub output: PathBuf,

    /// Ordered transform steps.
    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// Live-reload action after a successful run in a serving pipeline.
    #[serde(default)]
    pub reload: ReloadKind,

    /// Watch patterns. `None` means "watch `inputs`"; an empty list
    /// disables watching for this task.
    #[serde(default)]
    pub watch: Option<Vec<String>>,
}

impl TaskConfig {
    /// Patterns used for the watch binding of this task.
    pub fn effective_watch(&self) -> &[String] {
        match &self.watch {
            Some(list) => list,
            None => &self.inputs,
        }
    }
}

/// One transform step, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepConfig {
    CssImport,
    Autoprefix {
        #[serde(default)]
        browsers: BTreeMap<String, String>,
    },
    MinifyCss {
        #[serde(default)]
        browsers: BTreeMap<String, String>,
    },
    MinifyJs,
    FileInclude {
        #[serde(default = "default_include_prefix")]
        prefix: String,
        /// Base directory for include paths; `None` resolves relative to
        /// the including file.
        #[serde(default)]
        basepath: Option<PathBuf>,
    },
    MinifyHtml,
    Rename {
        #[serde(default)]
        prefix: Option<String>,
        #[serde(default)]
        suffix: Option<String>,
        #[serde(default)]
        basename: Option<String>,
        #[serde(default)]
        extname: Option<String>,
    },
    Webp,
    Avif {
        #[serde(default = "default_avif_quality")]
        quality: u8,
        #[serde(default = "default_avif_speed")]
        speed: u8,
    },
    OptimizeImage {
        #[serde(default = "default_jpeg_quality")]
        jpeg_quality: u8,
    },
    SvgSprite {
        #[serde(default = "default_sprite_name")]
        sprite: String,
    },
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        extname: Option<String>,
    },
    Size {
        #[serde(default)]
        title: Option<String>,
    },
    Sourcemap,
}

fn default_include_prefix() -> String {
    "@@".to_string()
}

fn default_avif_quality() -> u8 {
    70
}

fn default_avif_speed() -> u8 {
    6
}

fn default_jpeg_quality() -> u8 {
    80
}

fn default_sprite_name() -> String {
    "sprite.svg".to_string()
}

/// `[pipeline.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Top-level children, run in sequence.
    pub run: Vec<NodeConfig>,

    /// Remove `config.output_root` contents before running.
    #[serde(default)]
    pub clean: bool,

    /// After a successful run, start the dev server and watch session.
    #[serde(default)]
    pub serve: bool,
}

/// A node of a pipeline tree as written in TOML.
///
/// - `"styles"` names a task or another pipeline.
/// - `{ parallel = [...] }` runs children concurrently.
/// - `{ series = [...] }` runs children in order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NodeConfig {
    Name(String),
    Parallel { parallel: Vec<NodeConfig> },
    Series { series: Vec<NodeConfig> },
}
