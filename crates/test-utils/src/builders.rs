#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::bail;
use checkflow::Task;
use serde_json::{Value, json};

/// Counts how many times a task's `run` was invoked.
#[derive(Debug, Clone, Default)]
pub struct RunCounter(Arc<AtomicUsize>);

impl RunCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// `Zero`: no dependencies, returns `["Some", "values"]`.
pub fn zero_task(counter: &RunCounter) -> Task {
    let counter = counter.clone();
    Task::new("Zero").run(move |_ctx| {
        counter.bump();
        Ok(json!(["Some", "values"]))
    })
}

/// `One`: depends on `Zero`, checks its `preflight` operation and appends
/// `"more", "values"` to Zero's result.
pub fn one_task(counter: &RunCounter) -> Task {
    let counter = counter.clone();
    Task::new("One")
        .depends_on(["Zero"])
        .operation("preflight", |_up| Ok(json!("OK")))
        .run(move |ctx| {
            counter.bump();
            let status = ctx.call("preflight")?;
            if status != json!("OK") {
                bail!("preflight returned {status}");
            }
            let mut data: Vec<String> = ctx.result_as("Zero")?;
            data.extend(["more".to_string(), "values".to_string()]);
            Ok(json!(data))
        })
}

/// The `Zero` / `One` pair with their run counters.
pub fn readme_tasks() -> (Task, Task, RunCounter, RunCounter) {
    let zero_runs = RunCounter::new();
    let one_runs = RunCounter::new();
    (
        zero_task(&zero_runs),
        one_task(&one_runs),
        zero_runs,
        one_runs,
    )
}

/// A task returning `value`.
pub fn constant_task(name: &str, deps: &[&str], value: Value, counter: &RunCounter) -> Task {
    let counter = counter.clone();
    Task::new(name)
        .depends_on(deps.iter().copied())
        .run(move |_ctx| {
            counter.bump();
            Ok(value.clone())
        })
}

/// A task whose `run` always raises.
pub fn failing_task(name: &str, deps: &[&str], counter: &RunCounter) -> Task {
    let counter = counter.clone();
    let name_owned = name.to_string();
    Task::new(name)
        .depends_on(deps.iter().copied())
        .run(move |_ctx| {
            counter.bump();
            bail!("{name_owned} exploded")
        })
}
