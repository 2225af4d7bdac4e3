// src/pipeline/mod.rs

//! Composition engine.
//!
//! - [`node`] defines the pipeline tree and the `series` / `parallel`
//!   combinators.
//! - [`executor`] runs trees against a [`crate::task::TaskRegistry`].
//! - [`Pipeline`] is a named tree from the config file, with its `clean`
//!   and `serve` flags.

pub mod executor;
pub mod node;

use crate::config::model::{ConfigFile, NodeConfig};
use crate::errors::{AssetflowError, Result};

pub use executor::PipelineExecutor;
pub use node::{parallel, series, PipelineNode};

/// A named, runnable pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub name: String,
    pub root: PipelineNode,
    /// Remove previous output before running.
    pub clean: bool,
    /// Start the dev server and watch session after a successful run.
    pub serve: bool,
}

impl Pipeline {
    /// Resolve `name` to a pipeline.
    ///
    /// A pipeline name expands its `run` list (references to other
    /// pipelines are inlined). A task name yields a single-task pipeline
    /// with `clean` and `serve` off.
    pub fn resolve(cfg: &ConfigFile, name: &str) -> Result<Self> {
        if let Some(pc) = cfg.pipelines().get(name) {
            let mut stack = vec![name.to_string()];
            let children = pc
                .run
                .iter()
                .map(|n| expand(cfg, n, &mut stack))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Self {
                name: name.to_string(),
                root: PipelineNode::Sequence(children),
                clean: pc.clean,
                serve: pc.serve,
            });
        }

        if cfg.tasks().contains_key(name) {
            return Ok(Self {
                name: name.to_string(),
                root: PipelineNode::task(name),
                clean: false,
                serve: false,
            });
        }

        Err(AssetflowError::UnknownTask(name.to_string()))
    }
}

fn expand(cfg: &ConfigFile, node: &NodeConfig, stack: &mut Vec<String>) -> Result<PipelineNode> {
    match node {
        NodeConfig::Name(name) => {
            let Some(pc) = cfg.pipelines().get(name) else {
                return Ok(PipelineNode::task(name.clone()));
            };
            if stack.contains(name) {
                return Err(AssetflowError::PipelineCycle(format!(
                    "{} -> {}",
                    stack.join(" -> "),
                    name
                )));
            }
            stack.push(name.clone());
            let children = pc
                .run
                .iter()
                .map(|n| expand(cfg, n, stack))
                .collect::<Result<Vec<_>>>()?;
            stack.pop();
            Ok(PipelineNode::Sequence(children))
        }
        NodeConfig::Series { series } => Ok(PipelineNode::Sequence(
            series
                .iter()
                .map(|n| expand(cfg, n, stack))
                .collect::<Result<Vec<_>>>()?,
        )),
        NodeConfig::Parallel { parallel } => Ok(PipelineNode::Parallel(
            parallel
                .iter()
                .map(|n| expand(cfg, n, stack))
                .collect::<Result<Vec<_>>>()?,
        )),
    }
}
