// src/task/mod.rs

//! Task model.
//!
//! - [`Task`] declares identity, dependencies, expiry, hash sources and its
//!   operations.
//! - [`operation`] holds the operation types and the single instrumentation
//!   wrapper every call goes through.
//! - [`context`] provides what a running operation can see.

pub mod context;
pub mod operation;

use std::fmt;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::expire::{self, DeferredDeletions, ExpirationPolicy};
use crate::hashing::HashSource;

pub use context::{TaskContext, Upstream};
pub use operation::{
    AuxOperation, RUN_OPERATION, RunOperation, Timed, TimingRecord, format_duration, instrument,
};

/// What a task does when one of its dependencies failed in the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpstreamFailure {
    /// Do not run; the task ends up [`TaskRunState::SkippedUpstreamFailed`].
    #[default]
    Fail,
    /// Log and run anyway.
    Skip,
}

/// Per-run state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskRunState {
    #[default]
    Pending,
    SkippedExplicit,
    SkippedCached,
    SkippedUpstreamFailed,
    Running,
    Executed,
    Failed,
}

impl TaskRunState {
    pub fn is_skipped(self) -> bool {
        matches!(
            self,
            TaskRunState::SkippedExplicit
                | TaskRunState::SkippedCached
                | TaskRunState::SkippedUpstreamFailed
        )
    }
}

impl fmt::Display for TaskRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskRunState::Pending => "pending",
            TaskRunState::SkippedExplicit => "skipped (explicit)",
            TaskRunState::SkippedCached => "skipped (cached)",
            TaskRunState::SkippedUpstreamFailed => "skipped (upstream failed)",
            TaskRunState::Running => "running",
            TaskRunState::Executed => "executed",
            TaskRunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// When a task's checkpointed result goes away.
///
/// The two deferred variants are bound to the owning pipeline's
/// [`DeferredDeletions`] when the task is added to it.
#[derive(Debug, Clone, Default)]
pub enum Expiry {
    Policy(ExpirationPolicy),
    #[default]
    AfterSession,
    OnComplete,
}

impl From<ExpirationPolicy> for Expiry {
    fn from(policy: ExpirationPolicy) -> Self {
        Expiry::Policy(policy)
    }
}

impl Expiry {
    pub(crate) fn bind(self, deferred: &DeferredDeletions, task: &str) -> ExpirationPolicy {
        match self {
            Expiry::Policy(p) => p,
            Expiry::AfterSession => expire::after_session(deferred, task),
            Expiry::OnComplete => expire::on_complete(deferred, task),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RunRecord {
    pub(crate) state: TaskRunState,
    pub(crate) result: Option<Value>,
    pub(crate) error: Option<String>,
    pub(crate) timings: Vec<TimingRecord>,
}

/// A named unit of work.
pub struct Task {
    name: String,
    deps: Vec<String>,
    expiry: Expiry,
    policy: Option<ExpirationPolicy>,
    script: Option<HashSource>,
    inputs: Option<Vec<HashSource>>,
    on_upstream_failure: UpstreamFailure,
    run: Option<RunOperation>,
    operations: Vec<(String, AuxOperation)>,
    record: RunRecord,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ops: Vec<&str> = self.operations.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("expiry", &self.expiry)
            .field("script", &self.script)
            .field("inputs", &self.inputs)
            .field("on_upstream_failure", &self.on_upstream_failure)
            .field("has_run", &self.run.is_some())
            .field("operations", &ops)
            .field("state", &self.record.state)
            .finish()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Task ('{}')>", self.name)
    }
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            expiry: Expiry::default(),
            policy: None,
            script: None,
            inputs: None,
            on_upstream_failure: UpstreamFailure::default(),
            run: None,
            operations: Vec::new(),
            record: RunRecord::default(),
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn expire(mut self, expiry: impl Into<Expiry>) -> Self {
        self.expiry = expiry.into();
        self
    }

    /// Declare input sources; their combined hash invalidates the checkpoint
    /// when any of them changes.
    pub fn inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<HashSource>,
    {
        self.inputs
            .get_or_insert_with(Vec::new)
            .extend(inputs.into_iter().map(Into::into));
        self
    }

    /// Hash the file defining this task's logic.
    pub fn script_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.script = Some(HashSource::path(path));
        self
    }

    /// Hash an explicit version string instead of a script file.
    pub fn script_version(mut self, version: impl AsRef<str>) -> Self {
        self.script = Some(HashSource::bytes(version.as_ref().as_bytes()));
        self
    }

    pub fn script(mut self, source: HashSource) -> Self {
        self.script = Some(source);
        self
    }

    pub fn on_upstream_failure(mut self, behaviour: UpstreamFailure) -> Self {
        self.on_upstream_failure = behaviour;
        self
    }

    pub fn run<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut TaskContext<'_>) -> anyhow::Result<Value> + Send + 'static,
    {
        self.run = Some(Box::new(f));
        self
    }

    /// Register an auxiliary operation. Re-registering a name replaces it.
    pub fn operation<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnMut(&Upstream<'_>) -> anyhow::Result<Value> + Send + 'static,
    {
        let name = name.into();
        let op: AuxOperation = Box::new(f);
        match self.operations.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = op,
            None => self.operations.push((name, op)),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependency_names(&self) -> &[String] {
        &self.deps
    }

    pub fn expiry(&self) -> &Expiry {
        &self.expiry
    }

    /// The policy evaluated when this task's result is stored.
    ///
    /// Bound when the task joins a pipeline; `None` before that.
    pub fn expiration_policy(&self) -> Option<&ExpirationPolicy> {
        self.policy.as_ref()
    }

    pub fn script_source(&self) -> Option<&HashSource> {
        self.script.as_ref()
    }

    pub fn input_sources(&self) -> Option<&[HashSource]> {
        self.inputs.as_deref()
    }

    pub fn upstream_failure_behaviour(&self) -> UpstreamFailure {
        self.on_upstream_failure
    }

    pub fn has_run(&self) -> bool {
        self.run.is_some()
    }

    /// Names of auxiliary operations, in registration order.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().map(|(n, _)| n.as_str())
    }

    pub fn state(&self) -> TaskRunState {
        self.record.state
    }

    pub fn is_executed(&self) -> bool {
        self.record.state == TaskRunState::Executed
    }

    pub fn is_skipped(&self) -> bool {
        self.record.state.is_skipped()
    }

    /// Result produced or reused in the last run.
    pub fn result(&self) -> Option<&Value> {
        self.record.result.as_ref()
    }

    pub fn result_as<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        let value = self
            .result()
            .ok_or_else(|| anyhow::anyhow!("task '{}' has no result", self.name))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Message of the error raised in the last run, if it failed.
    pub fn error(&self) -> Option<&str> {
        self.record.error.as_deref()
    }

    /// Every instrumented call so far, oldest first.
    pub fn timings(&self) -> &[TimingRecord] {
        &self.record.timings
    }

    /// Invoke an auxiliary operation outside of `run`.
    pub fn call(&mut self, operation: &str, upstream: &Upstream<'_>) -> anyhow::Result<Value> {
        context::call_operation(
            &self.name,
            operation,
            &mut self.operations,
            &mut self.record.timings,
            upstream,
        )
    }

    pub(crate) fn bind(&mut self, deferred: &DeferredDeletions) {
        let policy = self.expiry.clone().bind(deferred, &self.name);
        self.policy = Some(policy);
    }

    pub(crate) fn record_mut(&mut self) -> &mut RunRecord {
        &mut self.record
    }

    /// Reset per-run state ahead of a new execution pass.
    pub(crate) fn begin_run(&mut self) {
        self.record.state = TaskRunState::Pending;
        self.record.result = None;
        self.record.error = None;
    }

    /// Invoke `run` through the instrumentation wrapper.
    ///
    /// Returns `None` when no run operation is registered.
    pub(crate) fn invoke_run(&mut self, upstream: Upstream<'_>) -> Option<anyhow::Result<Value>> {
        let Task {
            name,
            run,
            operations,
            record,
            ..
        } = self;
        let name: &str = name;
        let run = run.as_mut()?;

        let timed = {
            let mut ctx = TaskContext::new(name, upstream, operations, &mut record.timings);
            instrument(name, RUN_OPERATION, || run(&mut ctx))
        };
        record.timings.push(timed.record);
        Some(timed.output)
    }
}
