#![allow(dead_code)]

use std::path::Path;

use checkflow::errors::Result;
use checkflow::{Pipeline, Task};

pub use checkflow_test_utils::init_tracing;

/// Build a pipeline named `name` storing under `root`, with `tasks` attached.
pub fn build_pipeline(root: &Path, name: &str, tasks: Vec<Task>) -> Result<Pipeline> {
    let mut builder = Pipeline::builder(name).cache_dir(root);
    builder.add_all(tasks)?;
    builder.build()
}

/// Same as [`build_pipeline`] but with an in-memory store.
pub fn memory_pipeline(name: &str, tasks: Vec<Task>) -> Result<Pipeline> {
    let mut builder = Pipeline::builder(name).in_memory();
    builder.add_all(tasks)?;
    builder.build()
}
