//! Dependency graph restricted to the requested agents.

use cadence_agents::AgentRegistry;
use std::collections::{BTreeMap, BTreeSet};

/// Directed graph: agent → agents it waits for.
///
/// Nodes keep request order. Edges only point at other nodes; dependencies
/// on agents outside the request are treated as already satisfied and are
/// not represented.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyGraph {
    nodes: Vec<String>,
    positions: BTreeMap<String, usize>,
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Agents in request order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.positions.contains_key(agent)
    }

    /// Request position of `agent`.
    pub fn position(&self, agent: &str) -> Option<usize> {
        self.positions.get(agent).copied()
    }

    /// In-request dependencies of `agent`, sorted by name.
    pub fn dependencies_of(&self, agent: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(agent)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    /// Agents that wait for `agent`, in request order.
    pub fn dependents_of(&self, agent: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|node| self.edges.get(*node).is_some_and(|deps| deps.contains(agent)))
            .map(String::as_str)
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }
}

/// Builds a [`DependencyGraph`] from registry profiles.
pub struct DependencyGraphBuilder;

impl DependencyGraphBuilder {
    /// Build the graph for `agents`. Later duplicates of a name are ignored.
    pub fn build<S: AsRef<str>>(registry: &AgentRegistry, agents: &[S]) -> DependencyGraph {
        let mut graph = DependencyGraph::default();

        for agent in agents.iter().map(AsRef::as_ref) {
            if graph.positions.contains_key(agent) {
                continue;
            }
            graph.positions.insert(agent.to_string(), graph.nodes.len());
            graph.nodes.push(agent.to_string());
        }

        for agent in &graph.nodes {
            let deps: BTreeSet<String> = registry
                .lookup(agent)
                .map(|profile| {
                    profile
                        .depends_on
                        .iter()
                        .filter(|dep| *dep != agent && graph.positions.contains_key(*dep))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            if !deps.is_empty() {
                graph.edges.insert(agent.clone(), deps);
            }
        }

        graph
    }
}
