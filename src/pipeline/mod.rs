// src/pipeline/mod.rs

//! Pipeline assembly and inspection.
//!
//! - [`PipelineBuilder`] collects tasks, binds their expiry to the pipeline's
//!   deferred-deletion registry and opens the checkpoint store.
//! - [`Pipeline`] owns the tasks and the store; see [`execution`] for the
//!   per-run state machine and [`cleanup`] for post-run deletions.
//! - [`session`] holds the process-wide `after_session` teardown list.

pub mod cleanup;
pub mod execution;
pub mod session;

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::checkpoint::{CheckpointCache, HASH_SUFFIX};
use crate::config::{ConfigSection, pipeline_store_dir, resolve_cache_root};
use crate::dag::{TaskGraph, topological_order};
use crate::errors::{CheckflowError, Result, SchedulingError};
use crate::expire::DeferredDeletions;
use crate::fs::FileSystem;
use crate::task::Task;

pub use execution::{ExecuteOptions, RunSummary};
pub use session::{end_session, pending_deletions};

/// Reference to a task inside a pipeline, returned by [`PipelineBuilder::add`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    name: String,
    index: usize,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug)]
enum StoreLocation {
    /// `<root>/<pipeline name>`; root resolved from config / env when `None`.
    Disk(Option<PathBuf>),
    Memory,
}

/// Two-phase construction of a [`Pipeline`].
#[derive(Debug)]
pub struct PipelineBuilder {
    name: String,
    location: StoreLocation,
    fs: Option<Arc<dyn FileSystem>>,
    expire_null_results: bool,
    deferred: DeferredDeletions,
    tasks: Vec<Task>,
}

impl PipelineBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: StoreLocation::Disk(None),
            fs: None,
            expire_null_results: false,
            deferred: DeferredDeletions::new(),
            tasks: Vec::new(),
        }
    }

    /// Root directory for stores; this pipeline uses `<root>/<name>/`.
    pub fn cache_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.location = StoreLocation::Disk(Some(root.into()));
        self
    }

    /// Keep checkpoints in memory only.
    pub fn in_memory(mut self) -> Self {
        self.location = StoreLocation::Memory;
        self
    }

    /// Filesystem used to read script and input sources.
    pub fn filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn expire_null_results(mut self, enabled: bool) -> Self {
        self.expire_null_results = enabled;
        self
    }

    /// Apply a loaded `[config]` section.
    pub fn with_config(mut self, section: &ConfigSection) -> Self {
        if let Some(dir) = section.cache_dir.as_ref() {
            self.location = StoreLocation::Disk(Some(dir.clone()));
        }
        self.expire_null_results = section.expire_null_results;
        self
    }

    /// Registry the pipeline will use for `after_session` / `on_complete`
    /// deletions. Policies built with it apply to this pipeline only.
    pub fn deferred(&self) -> &DeferredDeletions {
        &self.deferred
    }

    /// Attach `task`. Names must be unique within the pipeline and must not
    /// end in [`HASH_SUFFIX`], which the store uses for hash records.
    pub fn add(&mut self, mut task: Task) -> Result<TaskHandle> {
        if task.name().ends_with(HASH_SUFFIX) {
            return Err(SchedulingError::ReservedTaskName(task.name().to_string()).into());
        }
        if self.tasks.iter().any(|t| t.name() == task.name()) {
            return Err(SchedulingError::DuplicateTask(task.name().to_string()).into());
        }

        task.bind(&self.deferred);
        debug!(pipeline = %self.name, task = %task.name(), "added task");

        let handle = TaskHandle {
            name: task.name().to_string(),
            index: self.tasks.len(),
        };
        self.tasks.push(task);
        Ok(handle)
    }

    pub fn add_all(&mut self, tasks: impl IntoIterator<Item = Task>) -> Result<Vec<TaskHandle>> {
        tasks.into_iter().map(|t| self.add(t)).collect()
    }

    /// Open the checkpoint store and produce the pipeline.
    pub fn build(self) -> Result<Pipeline> {
        let mut cache = match self.location {
            StoreLocation::Memory => CheckpointCache::in_memory(),
            StoreLocation::Disk(root) => {
                let root = match root {
                    Some(root) => root,
                    None => resolve_cache_root(&ConfigSection::default())?,
                };
                CheckpointCache::open(pipeline_store_dir(&root, &self.name))?
            }
        };
        if let Some(fs) = self.fs {
            cache = cache.with_fs(fs);
        }
        if let Some(dir) = cache.location() {
            session::register(dir, self.deferred.after_session());
        }

        debug!(pipeline = %self.name, tasks = self.tasks.len(), store = ?cache.location(), "built pipeline");

        Ok(Pipeline {
            name: self.name,
            tasks: self.tasks,
            cache,
            deferred: self.deferred,
            expire_null_results: self.expire_null_results,
            forced: BTreeSet::new(),
            ignored: BTreeSet::new(),
            failures: BTreeSet::new(),
            last_summary: None,
        })
    }
}

/// A set of tasks plus the checkpoint store they share.
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    tasks: Vec<Task>,
    cache: CheckpointCache,
    deferred: DeferredDeletions,
    expire_null_results: bool,
    forced: BTreeSet<String>,
    ignored: BTreeSet<String>,
    failures: BTreeSet<String>,
    last_summary: Option<RunSummary>,
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Pipeline: {} ({} tasks)>", self.name, self.ntasks())
    }
}

impl Pipeline {
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ntasks(&self) -> usize {
        self.tasks.len()
    }

    /// Every task executed or skipped in the last run. Vacuously true for an
    /// empty pipeline.
    pub fn is_complete(&self) -> bool {
        self.tasks
            .iter()
            .all(|t| t.is_executed() || t.is_skipped())
    }

    pub fn cache(&self) -> &CheckpointCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut CheckpointCache {
        &mut self.cache
    }

    pub fn deferred(&self) -> &DeferredDeletions {
        &self.deferred
    }

    /// Tasks in execution order, re-derived from current membership.
    pub fn tasks(&self) -> Result<Vec<&Task>> {
        self.execution_order()?
            .iter()
            .map(|name| self.get_task(name))
            .collect()
    }

    /// Names in execution order.
    pub fn execution_order(&self) -> Result<Vec<String>> {
        let graph = TaskGraph::new(
            self.tasks
                .iter()
                .map(|t| (t.name().to_string(), t.dependency_names().to_vec())),
        )?;
        Ok(topological_order(&graph)?)
    }

    pub fn get_task(&self, name: &str) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| CheckflowError::TaskNotFound(name.to_string()))
    }

    pub fn get_task_mut(&mut self, name: &str) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.name() == name)
            .ok_or_else(|| CheckflowError::TaskNotFound(name.to_string()))
    }

    /// Resolve a handle; `None` when it came from another pipeline.
    pub fn task(&self, handle: &TaskHandle) -> Option<&Task> {
        self.tasks
            .get(handle.index)
            .filter(|t| t.name() == handle.name)
    }

    /// Tasks named as dependencies of `name`, in declaration order.
    pub fn dependencies_of(&self, name: &str) -> Result<Vec<&Task>> {
        self.get_task(name)?
            .dependency_names()
            .iter()
            .map(|dep| self.get_task(dep))
            .collect()
    }

    /// Checkpointed result of `name`, if any.
    pub fn get_result(&self, name: &str) -> Result<Option<Value>> {
        self.cache.get(name)
    }

    /// Every task must have a `run` operation; all offenders are reported
    /// together.
    pub fn validate_tasks(&self) -> Result<()> {
        let missing_run: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| !t.has_run())
            .map(|t| t.name().to_string())
            .collect();

        if missing_run.is_empty() {
            Ok(())
        } else {
            Err(CheckflowError::Validation { missing_run })
        }
    }

    /// Names that always bypass the cache, on top of per-call options.
    pub fn set_forced<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forced.extend(names.into_iter().map(Into::into));
    }

    pub fn clear_forced(&mut self) {
        self.forced.clear();
    }

    pub fn forced(&self) -> &BTreeSet<String> {
        &self.forced
    }

    /// Names that are always skipped, on top of per-call options.
    pub fn set_ignored<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored.extend(names.into_iter().map(Into::into));
    }

    pub fn clear_ignored(&mut self) {
        self.ignored.clear();
    }

    pub fn ignored(&self) -> &BTreeSet<String> {
        &self.ignored
    }

    /// Tasks that failed, or were blocked by a failure, in the last run.
    pub fn failures(&self) -> &BTreeSet<String> {
        &self.failures
    }

    pub fn last_summary(&self) -> Option<&RunSummary> {
        self.last_summary.as_ref()
    }
}
