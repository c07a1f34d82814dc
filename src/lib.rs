// src/lib.rs

//! Dependency-ordered task pipelines with checkpointed results.
//!
//! Tasks declare their dependencies, input sources and an expiration policy.
//! A [`Pipeline`] runs them in a deterministic topological order and reuses
//! any stored result whose script and input hashes are unchanged.

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod expire;
pub mod fs;
pub mod hashing;
pub mod logging;
pub mod pipeline;
pub mod store;
pub mod task;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

use crate::checkpoint::CheckpointCache;
use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, default_config_path, load_and_validate, pipeline_store_dir};

pub use crate::checkpoint::CheckpointHashes;
pub use crate::errors::{CheckflowError, SchedulingError};
pub use crate::expire::{DeferredDeletions, ExpirationPolicy, Offset};
pub use crate::hashing::HashSource;
pub use crate::pipeline::{
    ExecuteOptions, Pipeline, PipelineBuilder, RunSummary, TaskHandle, end_session,
};
pub use crate::task::{Expiry, Task, TaskContext, TaskRunState, Upstream, UpstreamFailure};

/// High-level entry point used by `main.rs`.
pub fn run(args: CliArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_output(args, &mut out)
}

/// [`run`] writing its report to `out` instead of stdout.
pub fn run_with_output(args: CliArgs, out: &mut dyn Write) -> Result<()> {
    let cfg = load_config(args.config.as_ref())?;
    let root = match args.cache_dir {
        Some(dir) => dir,
        None => config::resolve_cache_root(&cfg.config)?,
    };
    let dir = pipeline_store_dir(&root, &args.pipeline);
    debug!(store = ?dir, command = ?args.command, "opening checkpoint store");

    let mut cache = CheckpointCache::open(&dir)
        .with_context(|| format!("opening checkpoint store at {:?}", dir))?;

    match args.command {
        Command::Keys => {
            for (key, kind) in cache.inspect()? {
                writeln!(out, "{key}\t{kind}")?;
            }
        }
        Command::Results => {
            for key in cache.result_keys()? {
                writeln!(out, "{key}")?;
            }
        }
        Command::Peek { key } => match cache.get(&key)? {
            Some(value) => writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?,
            None => anyhow::bail!("no entry for key '{key}'"),
        },
        Command::Delete { task } => {
            let existed = cache.delete(&task)?;
            writeln!(out, "{}", if existed { "deleted" } else { "not found" })?;
        }
        Command::Evict => {
            let removed = cache.evict_results()?;
            writeln!(out, "evicted {removed} result(s)")?;
        }
        Command::Clear => {
            let removed = cache.clear()?;
            writeln!(out, "cleared {removed} entries")?;
        }
        Command::Tags => {
            for tag in cache.tags()? {
                writeln!(out, "{tag}")?;
            }
        }
    }

    Ok(())
}

/// Explicit config paths must exist; the default one is optional.
fn load_config(path: Option<&PathBuf>) -> Result<ConfigFile> {
    match path {
        Some(path) => {
            load_and_validate(path).with_context(|| format!("loading config {:?}", path))
        }
        None => {
            let path = default_config_path();
            if path.is_file() {
                load_and_validate(&path).with_context(|| format!("loading config {:?}", path))
            } else {
                Ok(ConfigFile::default())
            }
        }
    }
}
