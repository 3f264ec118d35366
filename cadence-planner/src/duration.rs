//! Duration estimation for agents, phases and plans.

use cadence_agents::AgentRegistry;
use cadence_core::{EstimateProfile, ExecutionMode, ExecutionPhase};

/// Scales profile estimates by task complexity and risk.
#[derive(Debug, Clone, Copy)]
pub struct DurationEstimator<'a> {
    registry: &'a AgentRegistry,
    estimate: EstimateProfile,
}

impl<'a> DurationEstimator<'a> {
    pub fn new(registry: &'a AgentRegistry, estimate: EstimateProfile) -> Self {
        Self { registry, estimate }
    }

    /// Estimator with neutral complexity and risk.
    pub fn unscaled(registry: &'a AgentRegistry) -> Self {
        Self::new(registry, EstimateProfile::default())
    }

    pub fn estimate(&self) -> EstimateProfile {
        self.estimate
    }

    /// Scaled estimate for one agent, in seconds.
    pub fn agent_duration(&self, agent: &str) -> f64 {
        self.registry.get_profile(agent).duration_estimate * self.estimate.factor()
    }

    /// Parallel-safe phases take as long as their slowest agent; every other
    /// mode runs its agents back to back.
    pub fn phase_duration<S: AsRef<str>>(&self, mode: ExecutionMode, agents: &[S]) -> f64 {
        let durations = agents.iter().map(|a| self.agent_duration(a.as_ref()));
        match mode {
            ExecutionMode::ParallelSafe => durations.fold(0.0, f64::max),
            ExecutionMode::Sequential | ExecutionMode::Hybrid => durations.sum(),
        }
    }

    pub fn total_duration(&self, phases: &[ExecutionPhase]) -> f64 {
        phases.iter().map(|p| p.estimated_duration).sum()
    }

    /// Upper bound for a bare agent list: everything sequential.
    pub fn estimate_agents<S: AsRef<str>>(&self, agents: &[S]) -> f64 {
        self.phase_duration(ExecutionMode::Sequential, agents)
    }
}
