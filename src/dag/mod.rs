// src/dag/mod.rs

//! Task graph and scheduling.
//!
//! - [`graph`] holds the dependency graph of a task set, keyed by name.
//! - [`scheduler`] linearises it into a deterministic execution order.

pub mod graph;
pub mod scheduler;

pub use graph::TaskGraph;
pub use scheduler::{schedule, topological_order};
