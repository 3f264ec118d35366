//! Cadence Test Utilities
//!
//! Centralized test infrastructure for the Cadence workspace:
//! - Proptest generators for registries, requests and estimates
//! - Mock agent runners for executor tests
//! - Test fixtures for common planning scenarios
//! - Custom assertions for plan invariants

// Re-export core types for convenience
pub use cadence_agents::AgentRegistry;
pub use cadence_core::{
    AgentProfile, AgentRequest, CadenceError, CadenceResult, Capability, EstimateProfile,
    ExecutionMode, ExecutionPhase, ExecutionPlan, PhaseNumber, PlanDiagnostic, PlannerConfig,
    TaskComplexity, TaskRisk, UnresolvedPolicy,
};
pub use cadence_executor::{AgentInvocation, AgentOutcome, AgentRunner};

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MOCK RUNNERS
// ============================================================================

/// Scriptable [`AgentRunner`] that records every invocation.
///
/// Agents sleep for their configured delay, then succeed unless listed as
/// failing. A cancelled agent stops sleeping and reports failure.
#[derive(Debug, Default)]
pub struct MockRunner {
    failing: BTreeSet<String>,
    delays: BTreeMap<String, Duration>,
    default_delay: Duration,
    invocations: Mutex<Vec<AgentInvocation>>,
    cancelled: Mutex<Vec<String>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(agents.into_iter().map(Into::into));
        self
    }

    pub fn with_delay(mut self, agent: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(agent.into(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Agent names in invocation order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.invocations)
            .iter()
            .map(|i| i.agent.clone())
            .collect()
    }

    pub fn invocations(&self) -> Vec<AgentInvocation> {
        lock(&self.invocations).clone()
    }

    /// Agents that observed cancellation before finishing.
    pub fn cancelled_agents(&self) -> Vec<String> {
        lock(&self.cancelled).clone()
    }

    /// Highest number of agents that ran at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn delay_for(&self, agent: &str) -> Duration {
        self.delays.get(agent).copied().unwrap_or(self.default_delay)
    }
}

#[async_trait]
impl AgentRunner for MockRunner {
    async fn run(&self, invocation: AgentInvocation) -> AgentOutcome {
        let agent = invocation.agent.clone();
        let mut cancellation = invocation.cancellation.clone();
        lock(&self.invocations).push(invocation);

        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_running, Ordering::SeqCst);

        let cancelled = tokio::select! {
            _ = tokio::time::sleep(self.delay_for(&agent)) => false,
            _ = cancellation.cancelled() => true,
        };
        self.running.fetch_sub(1, Ordering::SeqCst);

        if cancelled {
            lock(&self.cancelled).push(agent.clone());
            AgentOutcome::failed(agent, "cancelled")
        } else if self.failing.contains(&agent) {
            AgentOutcome::failed(agent, "mock failure")
        } else {
            let artifact = format!("{}.out", agent);
            AgentOutcome::succeeded(agent).with_artifacts([artifact])
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Cadence planning inputs.

    use super::*;
    use cadence_core::{MAX_PRIORITY, MIN_PRIORITY};
    use proptest::prelude::*;

    const RESOURCE_TAGS: [&str; 4] = ["project_files", "file_system_write", "test_environment", "cache"];

    /// Generate a plausible agent name.
    pub fn arb_agent_name() -> impl Strategy<Value = String> {
        "[a-z][a-z_]{2,11}"
    }

    /// Generate a Capability, including custom tags.
    pub fn arb_capability() -> impl Strategy<Value = Capability> {
        prop_oneof![
            Just(Capability::ReadOnly),
            Just(Capability::FileCreation),
            Just(Capability::FileModification),
            Just(Capability::Analysis),
            Just(Capability::Architecture),
            Just(Capability::CodeGeneration),
            Just(Capability::Testing),
            Just(Capability::Review),
            "[a-z]{3,8}".prop_map(Capability::Custom),
        ]
    }

    pub fn arb_complexity() -> impl Strategy<Value = TaskComplexity> {
        prop::sample::select(TaskComplexity::ALL.to_vec())
    }

    pub fn arb_risk() -> impl Strategy<Value = TaskRisk> {
        prop::sample::select(TaskRisk::ALL.to_vec())
    }

    pub fn arb_estimate_profile() -> impl Strategy<Value = EstimateProfile> {
        (arb_complexity(), arb_risk()).prop_map(|(c, r)| EstimateProfile::new(c, r))
    }

    /// Generate a registry of `agent_0..agent_n` whose dependencies only point
    /// at lower indices, so it never contains a cycle. Conflicts, resources
    /// and parallel safety are random.
    pub fn arb_acyclic_registry(max_agents: usize) -> impl Strategy<Value = AgentRegistry> {
        (1..=max_agents.max(1))
            .prop_flat_map(|n| {
                prop::collection::vec(
                    (
                        1.0f64..120.0,
                        any::<bool>(),
                        MIN_PRIORITY..=MAX_PRIORITY,
                        prop::collection::vec(prop::bool::weighted(0.3), n),
                        prop::collection::vec(prop::bool::weighted(0.15), n),
                        prop::sample::subsequence(RESOURCE_TAGS.to_vec(), 0..=2),
                        prop::collection::btree_set(arb_capability(), 0..3),
                    ),
                    n,
                )
            })
            .prop_filter_map("registry must validate", |specs| {
                let profiles = specs.into_iter().enumerate().map(
                    |(i, (duration, parallel_safe, priority, deps, conflicts, resources, caps))| {
                        AgentProfile::new(agent_name(i), duration)
                            .with_parallel_safe(parallel_safe)
                            .with_priority(priority)
                            .with_dependencies(
                                (0..i).filter(|j| deps[*j]).map(agent_name),
                            )
                            .with_conflicts(
                                (0..conflicts.len())
                                    .filter(|j| *j != i && conflicts[*j])
                                    .map(agent_name),
                            )
                            .with_resources(resources)
                            .with_capabilities(caps)
                    },
                );
                AgentRegistry::from_profiles(profiles).ok()
            })
    }

    /// Generate an acyclic registry plus a shuffled request drawn from it,
    /// sometimes padded with agents the registry does not know.
    pub fn arb_registry_and_request(
        max_agents: usize,
    ) -> impl Strategy<Value = (AgentRegistry, Vec<String>)> {
        arb_acyclic_registry(max_agents)
            .prop_flat_map(|registry| {
                let names: Vec<String> = registry.names().map(str::to_string).collect();
                let len = names.len();
                (
                    Just(registry),
                    prop::sample::subsequence(names, 0..=len).prop_shuffle(),
                    prop::collection::vec("unknown_[a-z]{3}", 0..2),
                )
            })
            .prop_map(|(registry, mut request, unknown)| {
                for name in unknown {
                    if !request.contains(&name) {
                        request.push(name);
                    }
                }
                (registry, request)
            })
    }

    /// Generate a ring of 2..=5 agents where each depends on the next one.
    pub fn arb_cyclic_registry() -> impl Strategy<Value = (AgentRegistry, Vec<String>)> {
        (2usize..=5).prop_filter_map("ring must validate", |n| {
            let names: Vec<String> = (0..n).map(agent_name).collect();
            let profiles = (0..n).map(|i| {
                AgentProfile::new(names[i].clone(), 10.0)
                    .with_dependencies([names[(i + 1) % n].clone()])
            });
            AgentRegistry::from_profiles(profiles)
                .ok()
                .map(|registry| (registry, names.clone()))
        })
    }

    fn agent_name(i: usize) -> String {
        format!("agent_{}", i)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built registries and requests for common planning scenarios.

    use super::*;

    /// The built-in five-agent development pipeline.
    pub fn standard_registry() -> AgentRegistry {
        AgentRegistry::standard()
    }

    /// Requests without metadata, in the given order.
    pub fn requests(agents: &[&str]) -> Vec<AgentRequest> {
        agents.iter().map(|a| AgentRequest::new(*a)).collect()
    }

    /// Two parallel-safe checks feeding a sequential build and deploy.
    ///
    /// Plans to `[lint, scan]` (parallel) → `[build]` → `[deploy]`.
    pub fn pipeline_registry() -> CadenceResult<AgentRegistry> {
        AgentRegistry::from_profiles([
            AgentProfile::new("lint", 20.0)
                .with_capabilities([Capability::ReadOnly, Capability::Analysis])
                .with_parallel_safe(true),
            AgentProfile::new("scan", 10.0)
                .with_capabilities([Capability::ReadOnly, Capability::Review])
                .with_parallel_safe(true),
            AgentProfile::new("build", 30.0)
                .with_capabilities([Capability::FileCreation])
                .with_dependencies(["lint", "scan"])
                .with_resources(["file_system_write"])
                .with_priority(3),
            AgentProfile::new("deploy", 15.0)
                .with_dependencies(["build"])
                .with_resources(["file_system_write"])
                .with_priority(4),
        ])
    }

    /// `alpha` and `beta` depend on each other.
    pub fn cyclic_pair_registry() -> CadenceResult<AgentRegistry> {
        AgentRegistry::from_profiles([
            AgentProfile::new("alpha", 10.0).with_dependencies(["beta"]),
            AgentProfile::new("beta", 20.0).with_dependencies(["alpha"]),
        ])
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertion functions for plan invariants.

    use super::*;

    /// Assert that a CadenceResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &CadenceResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a CadenceResult is Err.
    #[track_caller]
    pub fn assert_err<T: std::fmt::Debug>(result: &CadenceResult<T>) {
        assert!(result.is_err(), "Expected Err, got Ok: {:?}", result);
    }

    /// Every in-plan dependency sits in a strictly earlier phase.
    #[track_caller]
    pub fn assert_dependencies_respected(plan: &ExecutionPlan, registry: &AgentRegistry) {
        for (idx, phase) in plan.phases.iter().enumerate() {
            for agent in &phase.agents {
                for dep in &registry.get_profile(agent).depends_on {
                    if let Some(dep_idx) = plan.phase_index_of(dep) {
                        assert!(
                            dep_idx < idx,
                            "{} (phase {}) depends on {} (phase {})",
                            agent,
                            phase.number,
                            dep,
                            plan.phases[dep_idx].number
                        );
                    }
                }
            }
        }
    }

    /// No parallel-safe phase holds a conflicting pair.
    #[track_caller]
    pub fn assert_no_parallel_conflicts(plan: &ExecutionPlan, registry: &AgentRegistry) {
        for phase in &plan.phases {
            if phase.execution_mode != ExecutionMode::ParallelSafe {
                continue;
            }
            for (i, a) in phase.agents.iter().enumerate() {
                for b in phase.agents.iter().skip(i + 1) {
                    assert!(
                        !registry.conflicts(a, b),
                        "conflicting {} and {} share parallel phase {}",
                        a,
                        b,
                        phase.number
                    );
                }
            }
        }
    }

    /// Each distinct requested agent is scheduled exactly once and nothing
    /// else is scheduled.
    #[track_caller]
    pub fn assert_complete<S: AsRef<str>>(plan: &ExecutionPlan, requested: &[S]) {
        let expected: BTreeSet<&str> = requested.iter().map(AsRef::as_ref).collect();
        let scheduled: Vec<&str> = plan.agents().map(String::as_str).collect();
        let distinct: BTreeSet<&str> = scheduled.iter().copied().collect();

        assert_eq!(
            scheduled.len(),
            distinct.len(),
            "agent scheduled twice: {:?}",
            scheduled
        );
        assert_eq!(distinct, expected, "scheduled set differs from request");
    }

    /// Phase numbers strictly increase through the plan.
    #[track_caller]
    pub fn assert_phase_numbers_increasing(plan: &ExecutionPlan) {
        for pair in plan.phases.windows(2) {
            assert!(
                pair[0].number < pair[1].number,
                "phase {} followed by {}",
                pair[0].number,
                pair[1].number
            );
        }
    }

    /// Durations follow the mode rule: max for parallel-safe, sum otherwise.
    #[track_caller]
    pub fn assert_phase_durations(plan: &ExecutionPlan, registry: &AgentRegistry) {
        let factor = plan.estimate.factor();
        for phase in &plan.phases {
            let durations = phase
                .agents
                .iter()
                .map(|a| registry.get_profile(a).duration_estimate * factor);
            let expected = match phase.execution_mode {
                ExecutionMode::ParallelSafe => durations.fold(0.0, f64::max),
                _ => durations.sum(),
            };
            assert!(
                (phase.estimated_duration - expected).abs() < 1e-9,
                "phase {} duration {} != {}",
                phase.number,
                phase.estimated_duration,
                expected
            );
        }
    }
}

// ============================================================================
// SELF TESTS
// ============================================================================
