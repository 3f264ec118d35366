//! Greedy grouping of a topological order into phases.

use crate::duration::DurationEstimator;
use crate::graph::DependencyGraph;
use cadence_agents::AgentRegistry;
use cadence_core::{ExecutionMode, ExecutionPhase, PhaseNumber, PlanDiagnostic, UnresolvedPolicy};
use std::collections::{BTreeSet, HashSet};

/// Phases produced by [`PhaseGrouper::group`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grouping {
    pub phases: Vec<ExecutionPhase>,
    /// Agents that could not be placed by dependency order
    pub unresolved: Vec<String>,
    pub diagnostics: Vec<PlanDiagnostic>,
}

/// Packs ready, mutually compatible agents into the same phase.
pub struct PhaseGrouper<'a> {
    registry: &'a AgentRegistry,
    estimator: DurationEstimator<'a>,
    policy: UnresolvedPolicy,
}

impl<'a> PhaseGrouper<'a> {
    pub fn new(
        registry: &'a AgentRegistry,
        estimator: DurationEstimator<'a>,
        policy: UnresolvedPolicy,
    ) -> Self {
        Self {
            registry,
            estimator,
            policy,
        }
    }

    /// Group `order` (a topological order of `graph`) into phases.
    pub fn group(&self, graph: &DependencyGraph, order: &[String]) -> Grouping {
        let mut grouping = Grouping::default();
        let mut processed: HashSet<&str> = HashSet::with_capacity(order.len());
        let mut completed: Vec<String> = Vec::with_capacity(order.len());
        let mut group = 1u32;

        while processed.len() < order.len() {
            let mut chosen: Vec<&str> = Vec::new();

            for agent in order.iter().map(String::as_str) {
                if processed.contains(agent) {
                    continue;
                }
                let ready = graph.dependencies_of(agent).all(|dep| processed.contains(dep));
                let compatible = chosen.iter().all(|c| !self.registry.conflicts(agent, c));
                if ready && compatible {
                    chosen.push(agent);
                }
            }

            if chosen.is_empty() {
                let remaining: Vec<String> = order
                    .iter()
                    .filter(|a| !processed.contains(a.as_str()))
                    .cloned()
                    .collect();
                grouping.diagnostics.push(PlanDiagnostic::UnresolvableRemainder {
                    agents: remaining.clone(),
                });

                if self.policy == UnresolvedPolicy::TrailingSequential {
                    grouping.phases.push(self.build_phase(
                        PhaseNumber::new(group),
                        &remaining,
                        ExecutionMode::Sequential,
                        completed.clone(),
                    ));
                }
                grouping.unresolved = remaining;
                break;
            }

            let mode = self.mode_for(&chosen);
            grouping.phases.push(self.build_phase(
                PhaseNumber::new(group),
                &chosen,
                mode,
                completed.clone(),
            ));
            for agent in chosen {
                processed.insert(agent);
                completed.push(agent.to_string());
            }
            group += 1;
        }

        grouping
    }

    /// SEQUENTIAL for a single agent, PARALLEL_SAFE when every agent is
    /// parallel-safe, HYBRID otherwise.
    pub fn mode_for<S: AsRef<str>>(&self, agents: &[S]) -> ExecutionMode {
        if agents.len() == 1 {
            ExecutionMode::Sequential
        } else if agents.iter().all(|a| self.registry.is_parallel_safe(a.as_ref())) {
            ExecutionMode::ParallelSafe
        } else {
            ExecutionMode::Hybrid
        }
    }

    /// Assemble a phase with its duration and lock set filled in.
    pub fn build_phase<S: AsRef<str>>(
        &self,
        number: PhaseNumber,
        agents: &[S],
        execution_mode: ExecutionMode,
        dependencies_satisfied: Vec<String>,
    ) -> ExecutionPhase {
        let resource_locks_needed: BTreeSet<String> = agents
            .iter()
            .flat_map(|a| {
                self.registry
                    .get_profile(a.as_ref())
                    .resource_requirements
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();

        ExecutionPhase {
            number,
            agents: agents.iter().map(|a| a.as_ref().to_string()).collect(),
            execution_mode,
            estimated_duration: self.estimator.phase_duration(execution_mode, agents),
            dependencies_satisfied,
            resource_locks_needed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyGraphBuilder;
    use crate::topo::TopologicalScheduler;
    use cadence_core::AgentProfile;

    fn group(registry: &AgentRegistry, agents: &[&str], policy: UnresolvedPolicy) -> Grouping {
        let graph = DependencyGraphBuilder::build(registry, agents);
        let order = TopologicalScheduler::sort(&graph).order;
        PhaseGrouper::new(registry, DurationEstimator::unscaled(registry), policy)
            .group(&graph, &order)
    }

    fn agents_of(grouping: &Grouping) -> Vec<Vec<&str>> {
        grouping
            .phases
            .iter()
            .map(|p| p.agents.iter().map(String::as_str).collect())
            .collect()
    }

    fn cyclic_registry() -> AgentRegistry {
        AgentRegistry::from_profiles([
            AgentProfile::new("a", 10.0).with_dependencies(["b"]),
            AgentProfile::new("b", 20.0).with_dependencies(["a"]),
            AgentProfile::new("c", 5.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_full_pipeline_grouping() {
        let registry = AgentRegistry::standard();
        let grouping = group(
            &registry,
            &["analyzer", "architect", "modifier", "tester", "reviewer"],
            UnresolvedPolicy::default(),
        );

        assert_eq!(
            agents_of(&grouping),
            vec![
                vec!["analyzer"],
                vec!["architect"],
                vec!["modifier"],
                vec!["tester", "reviewer"],
            ]
        );
        let last = &grouping.phases[3];
        assert_eq!(last.number, PhaseNumber::new(4));
        assert_eq!(last.execution_mode, ExecutionMode::ParallelSafe);
        assert_eq!(last.estimated_duration, 35.0);
        assert_eq!(last.dependencies_satisfied, ["analyzer", "architect", "modifier"]);
        assert!(last.resource_locks_needed.contains("test_environment"));
        assert!(last.resource_locks_needed.contains("project_files"));
        assert!(grouping.unresolved.is_empty());
    }

    #[test]
    fn test_single_agent_phase_is_sequential() {
        let registry = AgentRegistry::standard();
        let grouping = group(&registry, &["analyzer"], UnresolvedPolicy::default());
        assert_eq!(grouping.phases.len(), 1);
        assert_eq!(grouping.phases[0].execution_mode, ExecutionMode::Sequential);
    }

    #[test]
    fn test_conflicting_agents_split_even_when_ready() {
        let registry = AgentRegistry::from_profiles([
            AgentProfile::new("x", 10.0)
                .with_parallel_safe(true)
                .with_conflicts(["y"]),
            AgentProfile::new("y", 10.0).with_parallel_safe(true),
            AgentProfile::new("z", 10.0).with_parallel_safe(true),
        ])
        .unwrap();

        let grouping = group(&registry, &["x", "y", "z"], UnresolvedPolicy::default());
        assert_eq!(agents_of(&grouping), vec![vec!["x", "z"], vec!["y"]]);
    }

    #[test]
    fn test_mixed_phase_is_hybrid() {
        let registry = AgentRegistry::standard();
        let grouping = group(&registry, &["analyzer", "ghost"], UnresolvedPolicy::default());
        assert_eq!(grouping.phases.len(), 1);
        assert_eq!(grouping.phases[0].execution_mode, ExecutionMode::Hybrid);
        assert_eq!(grouping.phases[0].estimated_duration, 60.0);
    }

    #[test]
    fn test_cycle_trails_as_sequential_phase() {
        let registry = cyclic_registry();
        let grouping = group(&registry, &["a", "b", "c"], UnresolvedPolicy::TrailingSequential);

        assert_eq!(agents_of(&grouping), vec![vec!["c"], vec!["a", "b"]]);
        let trailing = &grouping.phases[1];
        assert_eq!(trailing.execution_mode, ExecutionMode::Sequential);
        assert_eq!(trailing.estimated_duration, 30.0);
        assert_eq!(trailing.number, PhaseNumber::new(2));
        assert_eq!(grouping.unresolved, ["a", "b"]);
        assert!(matches!(
            grouping.diagnostics.as_slice(),
            [PlanDiagnostic::UnresolvableRemainder { .. }]
        ));
    }

    #[test]
    fn test_cycle_halt_returns_partial_plan() {
        let registry = cyclic_registry();
        let grouping = group(&registry, &["a", "b", "c"], UnresolvedPolicy::Halt);

        assert_eq!(agents_of(&grouping), vec![vec!["c"]]);
        assert_eq!(grouping.unresolved, ["a", "b"]);
    }
}
