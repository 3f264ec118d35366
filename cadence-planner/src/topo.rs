//! Topological ordering with a deterministic cycle fallback.

use crate::graph::DependencyGraph;
use cadence_core::PlanDiagnostic;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Result of [`TopologicalScheduler::sort`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopologicalOrder {
    /// Every node exactly once; acyclic part first, then the fallback tail
    pub order: Vec<String>,
    /// Nodes that could not be released because of a cycle, in request order
    pub cyclic: Vec<String>,
}

impl TopologicalOrder {
    pub fn has_cycle(&self) -> bool {
        !self.cyclic.is_empty()
    }

    pub fn diagnostic(&self) -> Option<PlanDiagnostic> {
        self.has_cycle().then(|| PlanDiagnostic::CyclicDependency {
            agents: self.cyclic.clone(),
        })
    }
}

/// Kahn's algorithm over a [`DependencyGraph`].
pub struct TopologicalScheduler;

impl TopologicalScheduler {
    /// Order the graph so that every agent follows its dependencies.
    ///
    /// Among ready agents the one requested first is released first. If a
    /// cycle blocks progress, the blocked agents are appended in request
    /// order. Never fails.
    pub fn sort(graph: &DependencyGraph) -> TopologicalOrder {
        let nodes = graph.nodes();
        let mut in_degree: Vec<usize> = nodes
            .iter()
            .map(|node| graph.dependencies_of(node).count())
            .collect();
        let dependents: Vec<Vec<usize>> = nodes
            .iter()
            .map(|node| {
                graph
                    .dependents_of(node)
                    .into_iter()
                    .filter_map(|d| graph.position(d))
                    .collect()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut released = vec![false; nodes.len()];
        let mut order = Vec::with_capacity(nodes.len());

        while let Some(Reverse(idx)) = ready.pop() {
            released[idx] = true;
            order.push(nodes[idx].clone());
            for &dependent in &dependents[idx] {
                in_degree[dependent] = in_degree[dependent].saturating_sub(1);
                if in_degree[dependent] == 0 {
                    ready.push(Reverse(dependent));
                }
            }
        }

        let cyclic: Vec<String> = nodes
            .iter()
            .zip(&released)
            .filter(|(_, done)| !**done)
            .map(|(node, _)| node.clone())
            .collect();
        order.extend(cyclic.iter().cloned());

        TopologicalOrder { order, cyclic }
    }
}
