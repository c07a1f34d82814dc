// src/task/operation.rs

use std::fmt;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info};

use crate::task::context::{TaskContext, Upstream};

/// Name under which the main operation is timed and logged.
pub const RUN_OPERATION: &str = "run";

/// The designated `run` operation of a task.
pub type RunOperation = Box<dyn FnMut(&mut TaskContext<'_>) -> anyhow::Result<Value> + Send>;

/// A named auxiliary operation, callable from `run` via [`TaskContext::call`].
pub type AuxOperation = Box<dyn FnMut(&Upstream<'_>) -> anyhow::Result<Value> + Send>;

/// How long one instrumented call took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingRecord {
    pub operation: String,
    pub duration: Duration,
}

impl fmt::Display for TimingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.operation, format_duration(self.duration))
    }
}

/// Output of an instrumented call plus its timing.
#[derive(Debug)]
pub struct Timed<T> {
    pub output: anyhow::Result<T>,
    pub record: TimingRecord,
}

/// Invoke `f` as operation `operation` of `task`, timing and logging it.
pub fn instrument<T>(
    task: &str,
    operation: &str,
    f: impl FnOnce() -> anyhow::Result<T>,
) -> Timed<T> {
    if operation == RUN_OPERATION {
        info!(task = %task, "running");
    } else {
        debug!(task = %task, operation = %operation, "running operation");
    }

    let started = Instant::now();
    let output = f();
    let duration = started.elapsed();
    let elapsed = format_duration(duration);

    match &output {
        Ok(_) if operation == RUN_OPERATION => {
            info!(task = %task, outcome = "success", elapsed = %elapsed, "done");
        }
        Ok(_) => {
            info!(task = %task, operation = %operation, outcome = "success", elapsed = %elapsed, "done");
        }
        Err(err) => {
            debug!(task = %task, operation = %operation, elapsed = %elapsed, error = %err, "operation raised");
        }
    }

    Timed {
        output,
        record: TimingRecord {
            operation: operation.to_string(),
            duration,
        },
    }
}

/// Render a duration as `M:SS.ss`.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs_f64();
    let minutes = (total / 60.0).floor();
    let seconds = total - minutes * 60.0;
    format!("{}:{:05.2}", minutes as u64, seconds)
}
