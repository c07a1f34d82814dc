// src/task/context.rs

use std::collections::BTreeMap;

use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::checkpoint::CheckpointCache;
use crate::errors::CheckflowError;
use crate::task::operation::{AuxOperation, TimingRecord, instrument};

static NO_RESULTS: BTreeMap<String, Value> = BTreeMap::new();

/// Read-only view of other tasks' results.
///
/// Results produced earlier in the current run win; otherwise the last
/// checkpointed result is used.
#[derive(Debug, Clone, Copy)]
pub struct Upstream<'a> {
    results: &'a BTreeMap<String, Value>,
    cache: Option<&'a CheckpointCache>,
}

impl<'a> Upstream<'a> {
    pub fn new(results: &'a BTreeMap<String, Value>, cache: Option<&'a CheckpointCache>) -> Self {
        Self { results, cache }
    }

    /// A view with nothing in it.
    pub fn empty() -> Upstream<'static> {
        Upstream {
            results: &NO_RESULTS,
            cache: None,
        }
    }

    pub fn result(&self, task: &str) -> Option<Value> {
        if let Some(v) = self.results.get(task) {
            return Some(v.clone());
        }
        let cache = self.cache?;
        match cache.get(task) {
            Ok(v) => v,
            Err(err) => {
                warn!(task = %task, error = %err, "cannot read checkpointed result");
                None
            }
        }
    }

    /// Deserialize `task`'s result as `T`; a missing result is an error.
    pub fn result_as<T: DeserializeOwned>(&self, task: &str) -> anyhow::Result<T> {
        let value = self
            .result(task)
            .ok_or_else(|| anyhow!("no result available for task '{task}'"))?;
        Ok(serde_json::from_value(value)?)
    }
}

/// What a task's `run` operation sees while executing.
pub struct TaskContext<'a> {
    task: &'a str,
    upstream: Upstream<'a>,
    operations: &'a mut Vec<(String, AuxOperation)>,
    timings: &'a mut Vec<TimingRecord>,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(
        task: &'a str,
        upstream: Upstream<'a>,
        operations: &'a mut Vec<(String, AuxOperation)>,
        timings: &'a mut Vec<TimingRecord>,
    ) -> Self {
        Self {
            task,
            upstream,
            operations,
            timings,
        }
    }

    /// Name of the running task.
    pub fn name(&self) -> &str {
        self.task
    }

    pub fn upstream(&self) -> &Upstream<'a> {
        &self.upstream
    }

    pub fn result(&self, task: &str) -> Option<Value> {
        self.upstream.result(task)
    }

    pub fn result_as<T: DeserializeOwned>(&self, task: &str) -> anyhow::Result<T> {
        self.upstream.result_as(task)
    }

    /// Invoke one of this task's auxiliary operations by name.
    pub fn call(&mut self, operation: &str) -> anyhow::Result<Value> {
        call_operation(
            self.task,
            operation,
            self.operations.as_mut_slice(),
            &mut *self.timings,
            &self.upstream,
        )
    }
}

pub(crate) fn call_operation(
    task: &str,
    operation: &str,
    operations: &mut [(String, AuxOperation)],
    timings: &mut Vec<TimingRecord>,
    upstream: &Upstream<'_>,
) -> anyhow::Result<Value> {
    let Some((_, op)) = operations.iter_mut().find(|(name, _)| name == operation) else {
        return Err(CheckflowError::OperationNotFound {
            task: task.to_string(),
            operation: operation.to_string(),
        }
        .into());
    };

    let timed = instrument(task, operation, || op(upstream));
    timings.push(timed.record);
    timed.output
}
