// src/dag/graph.rs

use std::collections::HashMap;

use crate::errors::SchedulingError;

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    name: String,
    /// Direct dependencies, in declaration order.
    deps: Vec<String>,
    /// Direct dependents, in task insertion order.
    dependents: Vec<String>,
}

/// In-memory dependency graph keyed by task name.
///
/// Nodes keep the order in which tasks were supplied; the scheduler uses that
/// order to break ties. Construction rejects duplicate names and dependencies
/// on unknown tasks, but not cycles (see [`crate::dag::scheduler`]).
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    nodes: Vec<DagNode>,
    index: HashMap<String, usize>,
}

impl TaskGraph {
    /// Build a graph from `(task name, dependency names)` pairs.
    pub fn new<I, N, D>(entries: I) -> Result<Self, SchedulingError>
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        let mut graph = TaskGraph::default();

        for (name, deps) in entries {
            let name = name.into();
            if graph.index.contains_key(&name) {
                return Err(SchedulingError::DuplicateTask(name));
            }
            graph.index.insert(name.clone(), graph.nodes.len());
            graph.nodes.push(DagNode {
                name,
                deps: deps.into_iter().map(Into::into).collect(),
                dependents: Vec::new(),
            });
        }

        // Second pass: resolve deps and populate dependents.
        for i in 0..graph.nodes.len() {
            for dep in graph.nodes[i].deps.clone() {
                let Some(&j) = graph.index.get(&dep) else {
                    return Err(SchedulingError::UnknownDependency {
                        task: graph.nodes[i].name.clone(),
                        dependency: dep,
                    });
                };
                let name = graph.nodes[i].name.clone();
                let dependents = &mut graph.nodes[j].dependents;
                if !dependents.contains(&name) {
                    dependents.push(name);
                }
            }
        }

        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Position of `name` in insertion order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// All task names, in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.index
            .get(name)
            .map(|&i| self.nodes[i].deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[String] {
        self.index
            .get(name)
            .map(|&i| self.nodes[i].dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Every task that depends on `name`, directly or transitively, in
    /// insertion order.
    pub fn transitive_dependents(&self, name: &str) -> Vec<String> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack: Vec<&str> = self.dependents_of(name).iter().map(String::as_str).collect();

        while let Some(next) = stack.pop() {
            let Some(&i) = self.index.get(next) else {
                continue;
            };
            if seen[i] {
                continue;
            }
            seen[i] = true;
            stack.extend(self.nodes[i].dependents.iter().map(String::as_str));
        }

        self.nodes
            .iter()
            .zip(seen)
            .filter(|(_, s)| *s)
            .map(|(n, _)| n.name.clone())
            .collect()
    }
}
