//! Conflict detection and hybrid phase splitting.

use crate::grouper::PhaseGrouper;
use cadence_agents::AgentRegistry;
use cadence_core::{
    ConflictResolution, ConflictSeverity, ExecutionMode, ExecutionPhase, ResourceConflict,
};
use std::collections::BTreeSet;

// ============================================================================
// CONFLICTS
// ============================================================================

/// Reports declared conflicts among a set of requested agents.
pub struct ConflictResolver;

impl ConflictResolver {
    /// One entry per conflicting pair, in request order of the first member.
    pub fn detect_conflicts<S: AsRef<str>>(
        registry: &AgentRegistry,
        agents: &[S],
    ) -> Vec<ResourceConflict> {
        let mut conflicts = Vec::new();

        for (i, a) in agents.iter().map(AsRef::as_ref).enumerate() {
            for b in agents.iter().skip(i + 1).map(AsRef::as_ref) {
                if a == b || !registry.conflicts(a, b) {
                    continue;
                }
                conflicts.push(Self::describe(registry, a, b));
            }
        }

        conflicts
    }

    fn describe(registry: &AgentRegistry, a: &str, b: &str) -> ResourceConflict {
        let profile_a = registry.get_profile(a);
        let profile_b = registry.get_profile(b);
        let shared_resources: BTreeSet<String> = profile_a
            .resource_requirements
            .intersection(&profile_b.resource_requirements)
            .cloned()
            .collect();

        let severity = if profile_a.writes_files() || profile_b.writes_files() {
            ConflictSeverity::High
        } else if !shared_resources.is_empty() {
            ConflictSeverity::Medium
        } else {
            ConflictSeverity::Low
        };
        let resolution = if shared_resources.is_empty() {
            ConflictResolution::ResourceIsolation
        } else {
            ConflictResolution::Sequential
        };

        ResourceConflict {
            agent_a: a.to_string(),
            agent_b: b.to_string(),
            shared_resources,
            severity,
            resolution,
        }
    }
}

// ============================================================================
// OPTIMIZER
// ============================================================================

/// Splits hybrid phases so parallel-safe agents can still overlap.
pub struct PhaseOptimizer<'g, 'a> {
    grouper: &'g PhaseGrouper<'a>,
    registry: &'a AgentRegistry,
}

impl<'g, 'a> PhaseOptimizer<'g, 'a> {
    pub fn new(grouper: &'g PhaseGrouper<'a>, registry: &'a AgentRegistry) -> Self {
        Self { grouper, registry }
    }

    /// Rewrite every multi-agent HYBRID phase.
    ///
    /// Phase `N` keeps the parallel-safe agents as PARALLEL_SAFE; the rest
    /// move to a SEQUENTIAL sub-phase `N.5` that also waits for phase `N`.
    /// Without any parallel-safe agent the phase simply becomes SEQUENTIAL.
    /// Afterwards every `dependencies_satisfied` list is restated in the
    /// completion order of the rewritten phases.
    pub fn optimize(&self, phases: Vec<ExecutionPhase>) -> Vec<ExecutionPhase> {
        let mut optimized = Vec::with_capacity(phases.len());

        for phase in phases {
            if phase.execution_mode != ExecutionMode::Hybrid || phase.len() < 2 {
                optimized.push(phase);
                continue;
            }

            let (parallel, sequential): (Vec<&String>, Vec<&String>) = phase
                .agents
                .iter()
                .partition(|a| self.registry.is_parallel_safe(a));

            if parallel.is_empty() {
                optimized.push(self.grouper.build_phase(
                    phase.number,
                    &phase.agents,
                    ExecutionMode::Sequential,
                    phase.dependencies_satisfied.clone(),
                ));
                continue;
            }

            let head = self.grouper.build_phase(
                phase.number,
                &parallel,
                ExecutionMode::ParallelSafe,
                phase.dependencies_satisfied.clone(),
            );
            let mut tail_deps = phase.dependencies_satisfied.clone();
            tail_deps.extend(head.agents.iter().cloned());
            let tail = self.grouper.build_phase(
                phase.number.next_sub(),
                &sequential,
                ExecutionMode::Sequential,
                tail_deps,
            );

            tracing::debug!(
                phase = %phase.number,
                parallel = head.len(),
                sequential = tail.len(),
                "Split hybrid phase"
            );
            optimized.push(head);
            optimized.push(tail);
        }

        restate_completion_order(&mut optimized);
        optimized
    }
}

/// Rebuild cumulative `dependencies_satisfied` lists phase by phase, seeded
/// with whatever the first phase already waits for.
fn restate_completion_order(phases: &mut [ExecutionPhase]) {
    let mut completed: Vec<String> = phases
        .first()
        .map(|p| p.dependencies_satisfied.clone())
        .unwrap_or_default();

    for phase in phases.iter_mut() {
        phase.dependencies_satisfied = completed.clone();
        completed.extend(phase.agents.iter().cloned());
    }
}
