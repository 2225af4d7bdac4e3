#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use assetflow::config::{
    ConfigFile, ConfigSection, NodeConfig, PipelineConfig, RawConfigFile, ServerSection,
    StepConfig, TaskConfig,
};
use assetflow::errors::Result;
use assetflow::types::{FailurePolicy, ReloadKind};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                server: ServerSection::default(),
                task: BTreeMap::new(),
                pipeline: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_pipeline(mut self, name: &str, pipeline: PipelineConfig) -> Self {
        self.config.pipeline.insert(name.to_string(), pipeline);
        self
    }

    pub fn with_output_root(mut self, root: &str) -> Self {
        self.config.config.output_root = PathBuf::from(root);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.config.failure_policy = policy;
        self
    }

    /// Validate without panicking.
    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(input: &str, output: &str) -> Self {
        Self {
            task: TaskConfig {
                inputs: vec![input.to_string()],
                output: PathBuf::from(output),
                steps: Vec::new(),
                reload: ReloadKind::default(),
                watch: None,
            },
        }
    }

    pub fn input(mut self, pattern: &str) -> Self {
        self.task.inputs.push(pattern.to_string());
        self
    }

    pub fn step(mut self, step: StepConfig) -> Self {
        self.task.steps.push(step);
        self
    }

    pub fn reload(mut self, reload: ReloadKind) -> Self {
        self.task.reload = reload;
        self
    }

    pub fn watch(mut self, patterns: &[&str]) -> Self {
        self.task.watch = Some(patterns.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for `PipelineConfig`.
pub struct PipelineConfigBuilder {
    pipeline: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self {
            pipeline: PipelineConfig {
                run: Vec::new(),
                clean: false,
                serve: false,
            },
        }
    }

    /// Append a task or pipeline reference.
    pub fn then(mut self, name: &str) -> Self {
        self.pipeline.run.push(NodeConfig::Name(name.to_string()));
        self
    }

    /// Append a parallel group of names.
    pub fn parallel(mut self, names: &[&str]) -> Self {
        self.pipeline.run.push(NodeConfig::Parallel {
            parallel: names.iter().map(|n| NodeConfig::Name(n.to_string())).collect(),
        });
        self
    }

    pub fn clean(mut self) -> Self {
        self.pipeline.clean = true;
        self
    }

    pub fn serve(mut self) -> Self {
        self.pipeline.serve = true;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.pipeline
    }
}

impl Default for PipelineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
