//! Property-Based Tests for Phase Planning
//!
//! Properties checked over random acyclic registries and requests:
//! - Every in-plan dependency is scheduled in a strictly earlier phase
//! - Parallel-safe phases never hold a conflicting pair
//! - Planning is deterministic
//! - Every requested agent is scheduled exactly once
//! - Higher complexity or risk never shortens the plan
//!
//! Plus the concrete planning scenarios of the development pipeline.

use cadence_planner::ExecutionPlanner;
use cadence_test_utils::assertions::*;
use cadence_test_utils::fixtures::*;
use cadence_test_utils::generators::*;
use cadence_test_utils::{
    AgentRegistry, AgentRequest, EstimateProfile, ExecutionMode, PhaseNumber, PlanDiagnostic,
    PlannerConfig, UnresolvedPolicy,
};
use proptest::prelude::*;

fn planner_for(registry: AgentRegistry) -> ExecutionPlanner {
    ExecutionPlanner::new(registry, PlannerConfig::default()).unwrap()
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_single_agent_single_phase() {
    let planner = planner_for(standard_registry());
    let plan = planner.plan(&requests(&["analyzer"]), None).unwrap();

    assert_eq!(plan.phases.len(), 1);
    assert_eq!(plan.phases[0].agents, ["analyzer"]);
    assert_eq!(plan.scenario, "simple_analysis");
}

#[test]
fn test_dependency_splits_phases() {
    let planner = planner_for(standard_registry());
    let plan = planner
        .plan(&requests(&["analyzer", "architect"]), None)
        .unwrap();

    assert_eq!(plan.phases.len(), 2);
    assert_eq!(plan.phases[0].agents, ["analyzer"]);
    assert_eq!(plan.phases[1].agents, ["architect"]);
    assert!(plan.phases[1]
        .dependencies_satisfied
        .contains(&"analyzer".to_string()));
}

#[test]
fn test_conflicting_dependent_agents_stay_sequential() {
    let planner = planner_for(standard_registry());
    let plan = planner.plan(&requests(&["modifier", "tester"]), None).unwrap();

    assert_eq!(plan.phases.len(), 2);
    assert_eq!(plan.phases[0].agents, ["modifier"]);
    assert_eq!(plan.phases[1].agents, ["tester"]);
    assert!(plan
        .phases
        .iter()
        .all(|p| p.execution_mode == ExecutionMode::Sequential));
    assert_eq!(plan.conflicts.len(), 1);
}

#[test]
fn test_parallel_safe_pair_shares_phase() {
    let planner = planner_for(standard_registry());
    let plan = planner.plan(&requests(&["analyzer", "reviewer"]), None).unwrap();

    assert_eq!(plan.phases.len(), 1);
    let phase = &plan.phases[0];
    assert_eq!(phase.execution_mode, ExecutionMode::ParallelSafe);
    assert_eq!(phase.agents, ["analyzer", "reviewer"]);
    assert_eq!(phase.estimated_duration, 30.0);
}

#[test]
fn test_cycle_still_produces_plan() {
    let planner = planner_for(cyclic_pair_registry().unwrap());
    let plan = planner.plan(&requests(&["alpha", "beta"]), None).unwrap();

    assert!(!plan.is_empty());
    assert!(plan.contains("alpha"));
    assert!(plan.contains("beta"));
    assert!(plan.has_cycle());
    assert!(plan
        .diagnostics
        .iter()
        .any(|d| matches!(d, PlanDiagnostic::UnresolvableRemainder { .. })));
    assert!(plan.to_string().contains("Circular dependency detected"));
}

#[test]
fn test_blank_entry_skipped_with_diagnostic() {
    let planner = planner_for(standard_registry());
    let plan = planner
        .plan(&requests(&["analyzer", "", "reviewer"]), None)
        .unwrap();

    assert_complete(&plan, &["analyzer", "reviewer"]);
    assert_eq!(
        plan.diagnostics,
        vec![PlanDiagnostic::BlankRequest { position: 1 }]
    );
    assert!(plan
        .to_string()
        .contains("Request at position 1 has a blank agent name; skipped"));
}

#[test]
fn test_satisfied_dependencies_follow_split_completion() {
    let planner = planner_for(standard_registry());
    let plan = planner
        .plan_agents(&["ghost", "analyzer", "architect"])
        .unwrap();

    let numbers: Vec<String> = plan.phases.iter().map(|p| p.number.to_string()).collect();
    assert_eq!(numbers, ["1", "1.5", "2"]);
    assert_eq!(plan.phases[0].agents, ["analyzer"]);
    assert_eq!(plan.phases[1].agents, ["ghost"]);
    assert_eq!(plan.phases[1].dependencies_satisfied, ["analyzer"]);
    assert_eq!(plan.phases[2].dependencies_satisfied, ["analyzer", "ghost"]);
}

#[test]
fn test_pipeline_fixture_shape() {
    let registry = pipeline_registry().unwrap();
    let planner = planner_for(registry);
    let plan = planner
        .plan(&requests(&["deploy", "build", "scan", "lint"]), None)
        .unwrap();

    let shape: Vec<(PhaseNumber, ExecutionMode, Vec<&str>)> = plan
        .phases
        .iter()
        .map(|p| {
            (
                p.number,
                p.execution_mode,
                p.agents.iter().map(String::as_str).collect(),
            )
        })
        .collect();
    assert_eq!(
        shape,
        vec![
            (PhaseNumber::new(1), ExecutionMode::ParallelSafe, vec!["scan", "lint"]),
            (PhaseNumber::new(2), ExecutionMode::Sequential, vec!["build"]),
            (PhaseNumber::new(3), ExecutionMode::Sequential, vec!["deploy"]),
        ]
    );
    assert_eq!(plan.total_duration(), 20.0 + 30.0 + 15.0);
    assert!(plan.phases[1].resource_locks_needed.contains("file_system_write"));
}

#[test]
fn test_plan_serializes_round_trip() {
    let planner = planner_for(standard_registry());
    let plan = planner
        .plan(&requests(&["analyzer", "ghost", "reviewer"]), Some("review"))
        .unwrap();

    let json = serde_json::to_string(&plan).unwrap();
    let decoded: cadence_test_utils::ExecutionPlan = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, plan);
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Dependencies land strictly earlier, parallel phases are conflict-free,
    /// and every requested agent is scheduled exactly once.
    #[test]
    fn prop_acyclic_plans_hold_invariants(
        (registry, request) in arb_registry_and_request(8),
    ) {
        let planner = planner_for(registry);
        let plan = planner.plan_agents(&request).unwrap();

        assert_dependencies_respected(&plan, planner.registry());
        assert_no_parallel_conflicts(&plan, planner.registry());
        assert_complete(&plan, &request);
        assert_phase_numbers_increasing(&plan);
        assert_phase_durations(&plan, planner.registry());
        prop_assert!(plan.unresolved.is_empty());
        prop_assert!(!plan.has_cycle());
    }

    /// Same registry and request always give the same plan.
    #[test]
    fn prop_planning_is_deterministic(
        (registry, request) in arb_registry_and_request(8),
    ) {
        let planner = planner_for(registry);
        let first = planner.plan_agents(&request).unwrap();
        let second = planner.plan_agents(&request).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Scaling never shrinks any phase or the total.
    #[test]
    fn prop_duration_monotone_in_estimate(
        (registry, request) in arb_registry_and_request(6),
        low in arb_estimate_profile(),
        high in arb_estimate_profile(),
    ) {
        prop_assume!(low.complexity <= high.complexity && low.risk <= high.risk);
        let planner = planner_for(registry);
        let requests: Vec<AgentRequest> =
            request.iter().map(|a| AgentRequest::new(a.as_str())).collect();

        let small = planner.plan_with_estimate(&requests, None, low).unwrap();
        let large = planner.plan_with_estimate(&requests, None, high).unwrap();
        prop_assert!(small.total_duration() <= large.total_duration() + 1e-9);
        prop_assert_eq!(small.phases.len(), large.phases.len());
    }

    /// Cycles never panic, and with the trailing policy every member is
    /// still scheduled.
    #[test]
    fn prop_cycles_degrade_gracefully((registry, names) in arb_cyclic_registry()) {
        let planner = planner_for(registry.clone());
        let plan = planner.plan_agents(&names).unwrap();
        prop_assert!(plan.has_cycle());
        assert_complete(&plan, &names);

        let config = PlannerConfig {
            unresolved_policy: UnresolvedPolicy::Halt,
            ..Default::default()
        };
        let halted = ExecutionPlanner::new(registry, config)
            .unwrap()
            .plan_agents(&names)
            .unwrap();
        prop_assert!(halted.is_empty());
        prop_assert_eq!(halted.unresolved.len(), names.len());
    }

    /// Scenario hints are labels only.
    #[test]
    fn prop_hint_never_changes_phases(
        (registry, request) in arb_registry_and_request(6),
        hint in "[a-z_]{1,16}",
    ) {
        let planner = planner_for(registry);
        let requests: Vec<AgentRequest> =
            request.iter().map(|a| AgentRequest::new(a.as_str())).collect();
        let hinted = planner.plan(&requests, Some(hint.as_str())).unwrap();
        let plain = planner.plan(&requests, None).unwrap();
        prop_assert_eq!(&hinted.scenario, &hint);
        prop_assert_eq!(hinted.phases, plain.phases);
    }
}

#[test]
fn test_default_estimate_is_unscaled() {
    let planner = planner_for(standard_registry());
    let plan = planner
        .plan_with_estimate(&requests(&["modifier"]), None, EstimateProfile::default())
        .unwrap();
    assert_eq!(plan.total_duration(), 60.0);
}
