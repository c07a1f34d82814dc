// src/dag/scheduler.rs

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::dag::graph::TaskGraph;
use crate::errors::SchedulingError;

/// Produce the execution order for `graph`.
///
/// Every task appears after all of its dependencies. Among tasks that are
/// ready at the same time, the one inserted first wins, so identical input
/// always yields the identical order.
///
/// Fails with [`SchedulingError::Cycle`] naming the tasks on the cycle.
pub fn topological_order(graph: &TaskGraph) -> Result<Vec<String>, SchedulingError> {
    // Edge direction: dep -> task. Node indices follow insertion order.
    let mut dag: DiGraph<&str, ()> = DiGraph::with_capacity(graph.len(), 0);
    let nodes: Vec<NodeIndex> = graph.tasks().map(|name| dag.add_node(name)).collect();

    for (i, name) in graph.tasks().enumerate() {
        for dep in graph.dependencies_of(name) {
            if let Some(j) = graph.position(dep) {
                dag.update_edge(nodes[j], nodes[i], ());
            }
        }
    }

    let mut in_degree: Vec<usize> = nodes
        .iter()
        .map(|&n| dag.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(Reverse(i)) = ready.pop() {
        order.push(dag[nodes[i]].to_string());
        for succ in dag.neighbors_directed(nodes[i], Direction::Outgoing) {
            let j = succ.index();
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.push(Reverse(j));
            }
        }
    }

    if order.len() < graph.len() {
        return Err(SchedulingError::Cycle(cycle_members(&dag)));
    }

    debug!(order = ?order, "computed execution order");
    Ok(order)
}

/// Build the graph and order it in one step.
pub fn schedule<I, N, D>(entries: I) -> Result<Vec<String>, SchedulingError>
where
    I: IntoIterator<Item = (N, D)>,
    N: Into<String>,
    D: IntoIterator,
    D::Item: Into<String>,
{
    topological_order(&TaskGraph::new(entries)?)
}

/// Names of every task lying on a cycle, in insertion order.
fn cycle_members(dag: &DiGraph<&str, ()>) -> Vec<String> {
    let mut members: Vec<NodeIndex> = tarjan_scc(dag)
        .into_iter()
        .filter(|scc| scc.len() > 1 || dag.contains_edge(scc[0], scc[0]))
        .flatten()
        .collect();
    members.sort();
    members.into_iter().map(|n| dag[n].to_string()).collect()
}
