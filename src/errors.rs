// src/errors.rs

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

/// Problems found while turning the task set into an execution order.
///
/// All of these are fatal and are raised before any task runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("cycle detected in task graph involving: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("duplicate task name: '{0}'")]
    DuplicateTask(String),

    #[error("task name '{0}' ends with the reserved suffix '_hashes'")]
    ReservedTaskName(String),
}

#[derive(Error, Debug)]
pub enum CheckflowError {
    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    #[error("Tasks missing 'run' operation: {}", .missing_run.join(", "))]
    Validation { missing_run: Vec<String> },

    #[error("Task '{task}' not run: upstream task '{upstream}' failed")]
    DependencyFailure { task: String, upstream: String },

    #[error("Task '{task}' failed: {source:#}")]
    TaskExecution {
        task: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Operation '{operation}' not registered on task '{task}'")]
    OperationNotFound { task: String, operation: String },

    #[error("Expiration policy error: {0}")]
    Policy(String),

    #[error("Checkpoint store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CheckflowError>;
