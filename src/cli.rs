// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `assetflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetflow",
    version,
    about = "Build, serve and watch static site assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Assetflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Assetflow.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Abort the remaining children of a parallel group as soon as one
    /// fails (overrides `[config].failure_policy`).
    #[arg(long, global = true)]
    pub fail_fast: bool,

    /// Parse + validate, print the pipeline, but don't run anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the `default` pipeline (build, serve, watch). Stops on Ctrl-C.
    Dev,
    /// Run the `build` pipeline and exit.
    Build,
    /// Run a single task or pipeline by name.
    Run {
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Remove everything under the output root.
    Clean,
}

impl CliArgs {
    /// Subcommand, defaulting to `dev`.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Dev)
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
