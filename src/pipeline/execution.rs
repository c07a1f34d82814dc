// src/pipeline/execution.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::checkpoint::CheckpointHashes;
use crate::errors::{CheckflowError, Result};
use crate::pipeline::Pipeline;
use crate::task::{TaskRunState, Upstream, UpstreamFailure, format_duration};

/// Per-call overrides for [`Pipeline::execute`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Evict every cached result before scheduling.
    pub force: bool,
    /// Tasks that bypass their checkpoint. Wins over `skip_tasks`.
    pub force_tasks: BTreeSet<String>,
    /// Tasks that are not run at all.
    pub skip_tasks: BTreeSet<String>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn force_tasks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.force_tasks.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn skip_tasks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_tasks.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Outcome counts of one execution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration: Duration,
    /// Final state of every task, in execution order.
    pub states: Vec<(String, TaskRunState)>,
}

impl RunSummary {
    pub fn state_of(&self, task: &str) -> Option<TaskRunState> {
        self.states
            .iter()
            .find(|(name, _)| name == task)
            .map(|(_, s)| *s)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} executed, {} skipped, {} failed in {}",
            self.executed,
            self.skipped,
            self.failed,
            format_duration(self.duration)
        )
    }
}

/// Effective override sets for one run.
struct Overrides {
    force: BTreeSet<String>,
    skip: BTreeSet<String>,
}

impl Pipeline {
    /// Run every task once, in dependency order.
    ///
    /// Validation and scheduling errors abort before anything runs. Task
    /// failures do not: they are recorded, propagated to dependents and
    /// reflected in the returned summary.
    pub fn execute(&mut self, options: &ExecuteOptions) -> Result<RunSummary> {
        self.validate_tasks()?;
        let order = self.execution_order()?;

        let overrides = Overrides {
            force: self.forced.union(&options.force_tasks).cloned().collect(),
            skip: self.ignored.union(&options.skip_tasks).cloned().collect(),
        };

        let started = Instant::now();
        self.failures.clear();
        for task in self.tasks.iter_mut() {
            task.begin_run();
        }

        if options.force {
            info!(pipeline = %self.name, "clearing cached results (force)");
            self.cache.evict_results()?;
        }

        info!(pipeline = %self.name, tasks = order.len(), "starting pipeline execution");

        let mut results: BTreeMap<String, Value> = BTreeMap::new();
        for name in &order {
            let idx = self.index_of(name)?;
            self.step(idx, &overrides, &mut results);
        }

        self.cleanup_after_run();

        let summary = self.summarise(&order, started.elapsed());
        if summary.failed > 0 {
            warn!(pipeline = %self.name, summary = %summary, "pipeline finished with failures");
        } else {
            info!(pipeline = %self.name, outcome = "success", summary = %summary, "pipeline complete");
        }
        self.last_summary = Some(summary.clone());
        Ok(summary)
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.name() == name)
            .ok_or_else(|| CheckflowError::TaskNotFound(name.to_string()))
    }

    /// Drive one task from `Pending` to a terminal state.
    fn step(&mut self, idx: usize, overrides: &Overrides, results: &mut BTreeMap<String, Value>) {
        let name = self.tasks[idx].name().to_string();
        let forced = overrides.force.contains(&name);

        if overrides.skip.contains(&name) && !forced {
            info!(task = %name, "ignoring (explicit skip)");
            self.tasks[idx].record_mut().state = TaskRunState::SkippedExplicit;
            return;
        }

        let hashes = {
            let task = &self.tasks[idx];
            self.cache.fingerprint(task.script_source(), task.input_sources())
        };

        if !forced {
            if let Some(cached) = self.reusable_result(&name, &hashes) {
                info!(task = %name, "using previous result");
                results.insert(name.clone(), cached.clone());
                let record = self.tasks[idx].record_mut();
                record.result = Some(cached);
                record.state = TaskRunState::SkippedCached;
                return;
            }
        } else {
            debug!(task = %name, "forced; ignoring checkpoint");
        }

        let failed_upstream = self.tasks[idx]
            .dependency_names()
            .iter()
            .find(|dep| self.failures.contains(*dep))
            .cloned();

        if let Some(upstream) = failed_upstream {
            match self.tasks[idx].upstream_failure_behaviour() {
                UpstreamFailure::Fail => {
                    let err = CheckflowError::DependencyFailure {
                        task: name.clone(),
                        upstream,
                    };
                    warn!(task = %name, error = %err, "skipping");
                    let record = self.tasks[idx].record_mut();
                    record.error = Some(err.to_string());
                    record.state = TaskRunState::SkippedUpstreamFailed;
                    self.failures.insert(name);
                    return;
                }
                UpstreamFailure::Skip => {
                    warn!(task = %name, upstream = %upstream, "upstream task failed; running anyway");
                }
            }
        }

        info!(task = %name, "executing");
        self.tasks[idx].record_mut().state = TaskRunState::Running;

        let upstream = Upstream::new(results, Some(&self.cache));
        let outcome = self.tasks[idx].invoke_run(upstream).unwrap_or_else(|| {
            Err(CheckflowError::Validation {
                missing_run: vec![name.clone()],
            }
            .into())
        });

        match outcome {
            Ok(value) => {
                self.tasks[idx].record_mut().state = TaskRunState::Executed;
                self.checkpoint(idx, &value, &hashes);
                results.insert(name, value.clone());
                self.tasks[idx].record_mut().result = Some(value);
            }
            Err(source) => {
                let err = CheckflowError::TaskExecution {
                    task: name.clone(),
                    source,
                };
                error!(task = %name, error = %err, "task failed");
                let record = self.tasks[idx].record_mut();
                record.error = Some(err.to_string());
                record.state = TaskRunState::Failed;
                self.failures.insert(name);
            }
        }
    }

    /// The checkpointed result, if it is still valid under `hashes`.
    fn reusable_result(&self, name: &str, hashes: &CheckpointHashes) -> Option<Value> {
        let valid = match self.cache.is_valid(name, hashes) {
            Ok(valid) => valid,
            Err(err) => {
                warn!(task = %name, error = %err, "cannot read checkpoint; running task");
                return None;
            }
        };
        if !valid {
            return None;
        }
        match self.cache.get(name) {
            Ok(value) => value,
            Err(err) => {
                warn!(task = %name, error = %err, "cannot read checkpoint; running task");
                None
            }
        }
    }

    /// Persist a fresh result. Failures here leave the task `Executed` but
    /// without a checkpoint.
    fn checkpoint(&mut self, idx: usize, value: &Value, hashes: &CheckpointHashes) {
        let task = &self.tasks[idx];
        let name = task.name();

        let ttl = match task.expiration_policy().map(|p| p.ttl()).transpose() {
            Ok(ttl) => ttl.flatten(),
            Err(err) => {
                error!(task = %name, error = %err, "cannot evaluate expiration policy; result not checkpointed");
                return;
            }
        };

        if let Err(err) = self.cache.store(name, value, hashes, ttl) {
            error!(task = %name, error = %err, "cannot write checkpoint");
        }
    }

    fn summarise(&self, order: &[String], duration: Duration) -> RunSummary {
        let states: Vec<(String, TaskRunState)> = order
            .iter()
            .filter_map(|name| self.get_task(name).ok())
            .map(|t| (t.name().to_string(), t.state()))
            .collect();

        RunSummary {
            executed: states.iter().filter(|(_, s)| *s == TaskRunState::Executed).count(),
            skipped: states.iter().filter(|(_, s)| s.is_skipped()).count(),
            failed: states.iter().filter(|(_, s)| *s == TaskRunState::Failed).count(),
            duration,
            states,
        }
    }
}
