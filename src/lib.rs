// src/lib.rs

pub mod cleanup;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod reload;
pub mod task;
pub mod transform;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::exec::PipelineRunBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{Pipeline, PipelineExecutor};
use crate::reload::server::{LiveReloadServer, ServerOptions};
use crate::reload::Notifier;
use crate::task::{Completion, TaskRegistry};
use crate::types::FailurePolicy;
use crate::watch::{bindings_for_tasks, start_watch, WatchOptions};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the task registry
/// - pipeline resolution for the chosen command
/// - cleanup
/// - the dev server and watch session for serving pipelines
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let root = config_root_dir(&config_path);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let command = args.command();
    let pipeline_name = match &command {
        Command::Dev => "default",
        Command::Build => "build",
        Command::Run { name } => name.as_str(),
        Command::Clean => {
            if args.dry_run {
                println!("assetflow dry-run: would clean {}", cfg.config.output_root.display());
            } else {
                cleanup::clean(fs.as_ref(), &root, &cfg.config.output_root)?;
            }
            return Ok(());
        }
    };
    let pipeline = Pipeline::resolve(&cfg, pipeline_name)?;

    let policy = if args.fail_fast {
        FailurePolicy::FailFast
    } else {
        cfg.config.failure_policy
    };

    if args.dry_run {
        print_dry_run(&cfg, &pipeline, policy);
        return Ok(());
    }

    let registry = Arc::new(TaskRegistry::from_config(&cfg, &root, Arc::clone(&fs))?);
    info!(
        pipeline = %pipeline.name,
        tasks = registry.len(),
        ?policy,
        "starting pipeline"
    );

    if pipeline.clean {
        cleanup::clean(fs.as_ref(), &root, &cfg.config.output_root)?;
    }

    let server = if pipeline.serve {
        let serve_dir = cfg
            .server
            .root
            .clone()
            .unwrap_or_else(|| cfg.config.output_root.clone());
        Some(LiveReloadServer::start(ServerOptions {
            host: cfg.server.host.clone(),
            port: cfg.server.port,
            reload_port: cfg.server.reload_port,
            project_root: root.clone(),
            serve_dir,
        })?)
    } else {
        None
    };

    let mut executor = PipelineExecutor::new(Arc::clone(&registry), policy);
    if let Some(server) = &server {
        executor = executor.with_notifier(Arc::clone(server) as Arc<dyn Notifier>);
    }
    let executor = Arc::new(executor);

    if let Completion::Failed(failure) = executor.execute(pipeline.root.clone()).await {
        bail!("pipeline '{}' failed: {failure}", pipeline.name);
    }
    info!(pipeline = %pipeline.name, "pipeline finished");

    let Some(server) = server else {
        return Ok(());
    };

    let bindings = bindings_for_tasks(&registry, pipeline.root.task_names())?;
    let session = start_watch(
        &root,
        &bindings,
        PipelineRunBackend::new(Arc::clone(&executor)),
        WatchOptions {
            skip_unchanged: cfg.config.skip_unchanged,
        },
    )
    .await?;

    info!(url = %format!("http://{}", server.http_addr()), "serving; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("listening for Ctrl-C")?;

    info!("shutting down");
    session.stop().await?;
    server.shutdown();
    Ok(())
}

/// Figure out the project root all config paths are relative to.
///
/// - If the config path has a non-empty parent (e.g. "site/Assetflow.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetflow.toml" (parent = ""),
///   we fall back to the current working directory "."
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Print the resolved pipeline and the tasks it touches.
fn print_dry_run(cfg: &ConfigFile, pipeline: &Pipeline, policy: FailurePolicy) {
    println!("assetflow dry-run");
    println!("  config.output_root = {}", cfg.config.output_root.display());
    println!("  failure_policy = {policy:?}");
    println!();

    println!("pipeline {}:", pipeline.name);
    println!("  run: {}", pipeline.root);
    println!("  clean: {}", pipeline.clean);
    println!("  serve: {}", pipeline.serve);
    println!();

    let names = pipeline.root.task_names();
    println!("tasks ({}):", names.len());
    for name in names {
        let Some(task) = cfg.task.get(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      inputs: {:?}", task.inputs);
        println!("      output: {}", task.output.display());
        if !task.steps.is_empty() {
            println!("      steps: {}", task.steps.len());
        }
        let watch = task.effective_watch();
        if !watch.is_empty() {
            println!("      watch: {watch:?}");
        }
        println!("      reload: {:?}", task.reload);
    }

    debug!("dry-run complete (no execution)");
}
