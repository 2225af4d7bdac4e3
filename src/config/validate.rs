// src/config/validate.rs

use std::path::{Component, Path};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, NodeConfig, RawConfigFile, StepConfig};
use crate::errors::{AssetflowError, Result};
use crate::transform::css::browsers_from_config;
use crate::transform::selector::Selector;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AssetflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_output_root(cfg)?;
    validate_tasks(cfg)?;
    validate_pipeline_references(cfg)?;
    validate_pipeline_graph(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(AssetflowError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

/// The output root is deleted by `clean`, so it must stay inside the project.
fn validate_output_root(cfg: &RawConfigFile) -> Result<()> {
    let root = &cfg.config.output_root;
    if !is_contained_relative(root) {
        return Err(AssetflowError::ConfigError(format!(
            "[config].output_root must be a non-empty relative path without `..` (got {:?})",
            root
        )));
    }
    Ok(())
}

fn is_contained_relative(path: &Path) -> bool {
    let mut normal = 0usize;
    for component in path.components() {
        match component {
            Component::Normal(_) => normal += 1,
            Component::CurDir => {}
            _ => return false,
        }
    }
    normal > 0
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if cfg.pipeline.contains_key(name) {
            return Err(AssetflowError::ConfigError(format!(
                "'{}' is defined both as a task and as a pipeline",
                name
            )));
        }

        if task.inputs.is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "task '{}' must declare at least one input pattern",
                name
            )));
        }

        Selector::new(&task.inputs).map_err(|e| {
            AssetflowError::ConfigError(format!("task '{}' has invalid inputs: {e:#}", name))
        })?;

        if let Some(watch) = &task.watch {
            if !watch.is_empty() {
                Selector::new(watch).map_err(|e| {
                    AssetflowError::ConfigError(format!(
                        "task '{}' has invalid watch patterns: {e:#}",
                        name
                    ))
                })?;
            }
        }

        for step in task.steps.iter() {
            validate_step(name, step)?;
        }
    }
    Ok(())
}

fn validate_step(task: &str, step: &StepConfig) -> Result<()> {
    let invalid = |msg: String| {
        AssetflowError::ConfigError(format!("task '{}' has an invalid step: {}", task, msg))
    };

    match step {
        StepConfig::Autoprefix { browsers } | StepConfig::MinifyCss { browsers } => {
            browsers_from_config(browsers).map_err(invalid)?;
        }
        StepConfig::SvgSprite { sprite } if sprite.trim().is_empty() => {
            return Err(invalid("svg_sprite.sprite must not be empty".to_string()));
        }
        StepConfig::Command { program, .. } if program.trim().is_empty() => {
            return Err(invalid("command.program must not be empty".to_string()));
        }
        StepConfig::Avif { quality, speed } => {
            if *quality == 0 || *quality > 100 {
                return Err(invalid(format!("avif.quality must be 1..=100 (got {quality})")));
            }
            if *speed == 0 || *speed > 10 {
                return Err(invalid(format!("avif.speed must be 1..=10 (got {speed})")));
            }
        }
        StepConfig::OptimizeImage { jpeg_quality } if *jpeg_quality == 0 || *jpeg_quality > 100 => {
            return Err(invalid(format!(
                "optimize_image.jpeg_quality must be 1..=100 (got {jpeg_quality})"
            )));
        }
        _ => {}
    }
    Ok(())
}

fn validate_pipeline_references(cfg: &RawConfigFile) -> Result<()> {
    for (name, pipeline) in cfg.pipeline.iter() {
        if pipeline.run.is_empty() {
            return Err(AssetflowError::ConfigError(format!(
                "pipeline '{}' must have a non-empty `run` list",
                name
            )));
        }

        let mut referenced = Vec::new();
        for node in pipeline.run.iter() {
            collect_names(node, &mut referenced);
        }

        for reference in referenced {
            if !cfg.task.contains_key(reference) && !cfg.pipeline.contains_key(reference) {
                return Err(AssetflowError::ConfigError(format!(
                    "pipeline '{}' references unknown task or pipeline '{}'",
                    name, reference
                )));
            }
        }
    }
    Ok(())
}

fn validate_pipeline_graph(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: referenced pipeline -> referencing pipeline.
    //
    // [pipeline.default]
    // run = ["build"]
    //
    // adds edge build -> default.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.pipeline.keys() {
        graph.add_node(name.as_str());
    }

    for (name, pipeline) in cfg.pipeline.iter() {
        let mut referenced = Vec::new();
        for node in pipeline.run.iter() {
            collect_names(node, &mut referenced);
        }
        for reference in referenced {
            if cfg.pipeline.contains_key(reference) {
                graph.add_edge(reference, name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(AssetflowError::PipelineCycle(format!(
                "cycle detected in pipeline references involving '{}'",
                node
            )))
        }
    }
}

/// Every name referenced anywhere inside `node`.
pub(crate) fn collect_names<'a>(node: &'a NodeConfig, out: &mut Vec<&'a str>) {
    match node {
        NodeConfig::Name(name) => out.push(name.as_str()),
        NodeConfig::Parallel { parallel } => {
            for child in parallel {
                collect_names(child, out);
            }
        }
        NodeConfig::Series { series } => {
            for child in series {
                collect_names(child, out);
            }
        }
    }
}
