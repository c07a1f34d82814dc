// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The binary is a thin inspection layer over a pipeline's checkpoint store;
//! pipelines themselves are defined and executed from Rust code.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `checkflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "checkflow",
    version,
    about = "Inspect and clear checkpointed pipeline results.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Checkflow.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Root directory of pipeline stores. Overrides the config file.
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CHECKFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Name of the pipeline whose store to open.
    #[arg(value_name = "PIPELINE")]
    pub pipeline: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List every key in the store, with the kind of value it holds.
    Keys,
    /// List keys holding a real result (hashes entries omitted).
    Results,
    /// Print the value stored under KEY as JSON.
    Peek {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Delete TASK's result and hashes.
    Delete {
        #[arg(value_name = "TASK")]
        task: String,
    },
    /// Delete every cached result, keeping hashes.
    Evict,
    /// Delete everything in the store.
    Clear,
    /// List the distinct tags in use.
    Tags,
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
