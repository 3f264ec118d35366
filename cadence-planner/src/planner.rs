//! Execution planner: runs the full pipeline for one request.

use crate::duration::DurationEstimator;
use crate::graph::DependencyGraphBuilder;
use crate::grouper::PhaseGrouper;
use crate::optimizer::{ConflictResolver, PhaseOptimizer};
use crate::topo::TopologicalScheduler;
use cadence_agents::AgentRegistry;
use cadence_core::{
    AgentRequest, CadenceResult, EstimateProfile, ExecutionPlan, PlanDiagnostic, PlannerConfig,
};
use std::collections::HashSet;

/// Turns agent requests into an [`ExecutionPlan`].
///
/// Planning is pure and deterministic: the same registry, configuration and
/// request always yield the same plan.
#[derive(Debug, Clone)]
pub struct ExecutionPlanner {
    registry: AgentRegistry,
    config: PlannerConfig,
}

impl ExecutionPlanner {
    /// Create a planner. The configured default duration is applied to
    /// agents the registry does not know.
    pub fn new(registry: AgentRegistry, config: PlannerConfig) -> CadenceResult<Self> {
        config.validate()?;
        let registry = registry.with_default_duration(config.default_duration_secs)?;
        Ok(Self { registry, config })
    }

    /// Planner over the built-in agent catalog with default configuration.
    pub fn standard() -> CadenceResult<Self> {
        Self::new(AgentRegistry::standard(), PlannerConfig::default())
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan with neutral complexity and risk.
    pub fn plan(
        &self,
        requests: &[AgentRequest],
        scenario_hint: Option<&str>,
    ) -> CadenceResult<ExecutionPlan> {
        self.plan_with_estimate(requests, scenario_hint, EstimateProfile::default())
    }

    /// Plan a bare list of agent names.
    pub fn plan_agents<S: AsRef<str>>(&self, agents: &[S]) -> CadenceResult<ExecutionPlan> {
        let requests: Vec<AgentRequest> =
            agents.iter().map(|a| AgentRequest::new(a.as_ref())).collect();
        self.plan(&requests, None)
    }

    /// Plan with durations scaled by `estimate`.
    ///
    /// Malformed input (blank names, unknown agents, cycles, duplicates)
    /// degrades into a diagnostic on the returned plan.
    pub fn plan_with_estimate(
        &self,
        requests: &[AgentRequest],
        scenario_hint: Option<&str>,
        estimate: EstimateProfile,
    ) -> CadenceResult<ExecutionPlan> {
        let mut diagnostics = Vec::new();
        let mut seen = HashSet::with_capacity(requests.len());
        let mut agents: Vec<&str> = Vec::with_capacity(requests.len());
        for (position, request) in requests.iter().enumerate() {
            let agent = request.agent.as_str();
            if agent.trim().is_empty() {
                diagnostics.push(PlanDiagnostic::BlankRequest { position });
                continue;
            }
            if !seen.insert(agent) {
                if !diagnostics.iter().any(|d| is_duplicate_of(d, agent)) {
                    diagnostics.push(PlanDiagnostic::DuplicateRequest {
                        agent: agent.to_string(),
                    });
                }
                continue;
            }
            agents.push(agent);
        }

        diagnostics.extend(
            agents
                .iter()
                .filter(|a| !self.registry.is_known(a))
                .map(|a| PlanDiagnostic::UnknownAgent {
                    agent: a.to_string(),
                }),
        );

        let scenario = scenario_hint
            .map(str::to_string)
            .unwrap_or_else(|| self.registry.detect_scenario(&agents));

        let graph = DependencyGraphBuilder::build(&self.registry, &agents);
        let topo = TopologicalScheduler::sort(&graph);
        diagnostics.extend(topo.diagnostic());

        let estimator = DurationEstimator::new(&self.registry, estimate);
        let grouper = PhaseGrouper::new(&self.registry, estimator, self.config.unresolved_policy);
        let grouping = grouper.group(&graph, &topo.order);
        diagnostics.extend(grouping.diagnostics);

        let phases = if self.config.split_hybrid_phases {
            PhaseOptimizer::new(&grouper, &self.registry).optimize(grouping.phases)
        } else {
            grouping.phases
        };

        let plan = ExecutionPlan {
            phases,
            scenario,
            estimate,
            diagnostics,
            unresolved: grouping.unresolved,
            conflicts: ConflictResolver::detect_conflicts(&self.registry, &agents),
        };

        for diagnostic in &plan.diagnostics {
            tracing::warn!(scenario = %plan.scenario, "{}", diagnostic);
        }
        for phase in &plan.phases {
            tracing::debug!(
                phase = %phase.number,
                mode = phase.execution_mode.as_str(),
                agents = ?phase.agents,
                duration_secs = phase.estimated_duration,
                "Planned phase"
            );
        }
        tracing::info!(
            scenario = %plan.scenario,
            agents = agents.len(),
            phases = plan.phases.len(),
            total_duration_secs = plan.total_duration(),
            "Execution plan created"
        );

        Ok(plan)
    }
}

fn is_duplicate_of(diagnostic: &PlanDiagnostic, agent: &str) -> bool {
    matches!(diagnostic, PlanDiagnostic::DuplicateRequest { agent: a } if a == agent)
}
