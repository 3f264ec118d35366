//! Cadence Audit - Plan Validation and Statistics
//!
//! Pure checks over a finished [`ExecutionPlan`]:
//! - Dependency ordering, parallel conflicts and duplicate scheduling
//! - Warnings for uncharacterized agents and planner diagnostics
//! - Parallelization statistics and efficiency estimates
//!
//! Both the validator and the statistics calculator can be called any number
//! of times on the same plan.

use cadence_agents::AgentRegistry;
use cadence_core::{ExecutionMode, ExecutionPlan, PlanDiagnostic, PlannerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// VALIDATION TYPES
// ============================================================================

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Improvement hint, never blocks execution
    Suggestion,
    /// Plan can run but something deserves attention
    Warning,
    /// Plan must not run
    Error,
}

/// Type of validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Dependency not scheduled in a strictly earlier phase
    DependencyOrder,
    /// Conflicting agents share a parallel-safe phase
    ParallelConflict,
    /// Agent appears in more than one phase slot
    DuplicateScheduling,
    /// Agent missing from the registry
    UnknownAgent,
    /// Dependency cycle reported by the planner
    CircularDependency,
    /// Agents the planner could not place by dependency order
    UnresolvedAgents,
    /// Agent requested more than once
    DuplicateRequest,
    /// Request entry without an agent name
    BlankRequest,
    /// Too few parallel-safe phases
    LowParallelism,
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ValidationIssue {
    pub severity: Severity,
    pub issue_type: IssueType,
    /// Human-readable message
    pub message: String,
    /// Agents the issue is about
    #[serde(default)]
    pub agents: Vec<String>,
}

impl ValidationIssue {
    pub fn new(severity: Severity, issue_type: IssueType, message: impl Into<String>) -> Self {
        Self {
            severity,
            issue_type,
            message: message.into(),
            agents: Vec::new(),
        }
    }

    pub fn with_agents<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.agents.extend(agents.into_iter().map(Into::into));
        self
    }
}

/// Result of plan validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ValidationResult {
    /// False iff at least one error was found
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub optimization_suggestions: Vec<String>,
    /// Every finding, typed, in discovery order
    pub issues: Vec<ValidationIssue>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::valid()
    }
}

impl ValidationResult {
    /// Create a valid result with no issues.
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            optimization_suggestions: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// Record an issue; errors invalidate the result.
    pub fn add_issue(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => {
                self.valid = false;
                self.errors.push(issue.message.clone());
            }
            Severity::Warning => self.warnings.push(issue.message.clone()),
            Severity::Suggestion => self.optimization_suggestions.push(issue.message.clone()),
        }
        self.issues.push(issue);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get all issues of a specific type.
    pub fn issues_of_type(&self, issue_type: IssueType) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.issue_type == issue_type)
            .collect()
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

pub const LOW_PARALLELISM_SUGGESTION: &str =
    "Consider optimizing agent profiles for more parallel execution";

/// Checks a plan against the registry it was built from.
#[derive(Debug, Clone, Copy)]
pub struct PlanValidator<'a> {
    registry: &'a AgentRegistry,
    parallel_phase_ratio: f64,
}

impl<'a> PlanValidator<'a> {
    pub fn new(registry: &'a AgentRegistry, config: &PlannerConfig) -> Self {
        Self {
            registry,
            parallel_phase_ratio: config.parallel_phase_ratio,
        }
    }

    /// Validator with the default suggestion threshold.
    pub fn with_defaults(registry: &'a AgentRegistry) -> Self {
        Self::new(registry, &PlannerConfig::default())
    }

    /// Validate `plan`. Never mutates it and never fails.
    pub fn validate(&self, plan: &ExecutionPlan) -> ValidationResult {
        let mut result = ValidationResult::valid();

        self.check_dependencies(plan, &mut result);
        self.check_parallel_conflicts(plan, &mut result);
        self.check_duplicates(plan, &mut result);
        self.check_unknown_agents(plan, &mut result);
        self.check_diagnostics(plan, &mut result);
        self.check_parallelism(plan, &mut result);

        tracing::debug!(
            valid = result.valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "Plan validated"
        );
        result
    }

    fn check_dependencies(&self, plan: &ExecutionPlan, result: &mut ValidationResult) {
        for (idx, phase) in plan.phases.iter().enumerate() {
            for agent in &phase.agents {
                for dep in &self.registry.get_profile(agent).depends_on {
                    // Dependencies outside the plan count as satisfied
                    let Some(dep_idx) = plan.phase_index_of(dep) else {
                        continue;
                    };
                    if dep_idx >= idx {
                        result.add_issue(
                            ValidationIssue::new(
                                Severity::Error,
                                IssueType::DependencyOrder,
                                format!(
                                    "Agent {} in phase {} depends on {} which is not scheduled in an earlier phase",
                                    agent, phase.number, dep
                                ),
                            )
                            .with_agents([agent.as_str(), dep.as_str()]),
                        );
                    }
                }
            }
        }
    }

    fn check_parallel_conflicts(&self, plan: &ExecutionPlan, result: &mut ValidationResult) {
        for phase in plan
            .phases
            .iter()
            .filter(|p| p.execution_mode == ExecutionMode::ParallelSafe)
        {
            for (i, a) in phase.agents.iter().enumerate() {
                for b in phase.agents.iter().skip(i + 1) {
                    if self.registry.conflicts(a, b) {
                        result.add_issue(
                            ValidationIssue::new(
                                Severity::Error,
                                IssueType::ParallelConflict,
                                format!(
                                    "Conflicting agents {} and {} share parallel phase {}",
                                    a, b, phase.number
                                ),
                            )
                            .with_agents([a.as_str(), b.as_str()]),
                        );
                    }
                }
            }
        }
    }

    fn check_duplicates(&self, plan: &ExecutionPlan, result: &mut ValidationResult) {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut first_seen: Vec<&str> = Vec::new();
        for agent in plan.agents() {
            let count = counts.entry(agent.as_str()).or_insert(0);
            if *count == 0 {
                first_seen.push(agent.as_str());
            }
            *count += 1;
        }

        for agent in first_seen {
            let times = counts.get(agent).copied().unwrap_or(0);
            if times > 1 {
                result.add_issue(
                    ValidationIssue::new(
                        Severity::Error,
                        IssueType::DuplicateScheduling,
                        format!("Agent {} is scheduled {} times", agent, times),
                    )
                    .with_agents([agent]),
                );
            }
        }
    }

    fn check_unknown_agents(&self, plan: &ExecutionPlan, result: &mut ValidationResult) {
        let mut reported: Vec<&str> = Vec::new();
        for agent in plan.agents().chain(plan.unresolved.iter()) {
            if self.registry.is_known(agent) || reported.contains(&agent.as_str()) {
                continue;
            }
            reported.push(agent);
            result.add_issue(
                ValidationIssue::new(
                    Severity::Warning,
                    IssueType::UnknownAgent,
                    format!("Agent {} is uncharacterized; using default profile", agent),
                )
                .with_agents([agent.as_str()]),
            );
        }
    }

    fn check_diagnostics(&self, plan: &ExecutionPlan, result: &mut ValidationResult) {
        for diagnostic in &plan.diagnostics {
            let (issue_type, agents) = match diagnostic {
                PlanDiagnostic::UnknownAgent { .. } => continue,
                PlanDiagnostic::CyclicDependency { agents } => {
                    (IssueType::CircularDependency, agents.clone())
                }
                PlanDiagnostic::UnresolvableRemainder { agents } => {
                    (IssueType::UnresolvedAgents, agents.clone())
                }
                PlanDiagnostic::DuplicateRequest { agent } => {
                    (IssueType::DuplicateRequest, vec![agent.clone()])
                }
                PlanDiagnostic::BlankRequest { .. } => (IssueType::BlankRequest, Vec::new()),
            };
            result.add_issue(
                ValidationIssue::new(Severity::Warning, issue_type, diagnostic.to_string())
                    .with_agents(agents),
            );
        }
    }

    fn check_parallelism(&self, plan: &ExecutionPlan, result: &mut ValidationResult) {
        if plan.phases.is_empty() {
            return;
        }
        let parallel = plan
            .phases
            .iter()
            .filter(|p| p.execution_mode == ExecutionMode::ParallelSafe)
            .count();
        let share = parallel as f64 / plan.phases.len() as f64;
        if share < self.parallel_phase_ratio {
            result.add_issue(ValidationIssue::new(
                Severity::Suggestion,
                IssueType::LowParallelism,
                LOW_PARALLELISM_SUGGESTION,
            ));
        }
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Parallelization statistics for a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PlanStatistics {
    pub total_phases: usize,
    pub total_agents: usize,
    /// Agents scheduled in parallel-safe phases
    pub parallel_agents: usize,
    /// Percentage of agents in parallel-safe phases
    pub parallelization_rate: f64,
    /// Seconds if every agent ran back to back
    pub sequential_duration: f64,
    /// Seconds according to the plan
    pub parallel_duration: f64,
    /// Percentage of sequential time saved by the plan
    pub efficiency_gain: f64,
}

impl PlanStatistics {
    /// Seconds saved relative to fully sequential execution.
    pub fn time_saved(&self) -> f64 {
        self.sequential_duration - self.parallel_duration
    }
}

impl fmt::Display for PlanStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} phases, {} agents ({} parallel, {:.1}%), {:.1}s vs {:.1}s sequential ({:.1}% faster)",
            self.total_phases,
            self.total_agents,
            self.parallel_agents,
            self.parallelization_rate,
            self.parallel_duration,
            self.sequential_duration,
            self.efficiency_gain
        )
    }
}

/// Computes [`PlanStatistics`].
#[derive(Debug, Clone, Copy)]
pub struct PlanStatisticsCalculator<'a> {
    registry: &'a AgentRegistry,
}

impl<'a> PlanStatisticsCalculator<'a> {
    pub fn new(registry: &'a AgentRegistry) -> Self {
        Self { registry }
    }

    pub fn calculate(&self, plan: &ExecutionPlan) -> PlanStatistics {
        let total_agents = plan.agent_count();
        let parallel_agents: usize = plan
            .phases
            .iter()
            .filter(|p| p.execution_mode == ExecutionMode::ParallelSafe)
            .map(|p| p.len())
            .sum();

        let factor = plan.estimate.factor();
        let sequential_duration: f64 = plan
            .agents()
            .map(|a| self.registry.get_profile(a).duration_estimate * factor)
            .sum();
        let parallel_duration = plan.total_duration();

        let parallelization_rate = if total_agents == 0 {
            0.0
        } else {
            parallel_agents as f64 / total_agents as f64 * 100.0
        };
        let efficiency_gain = if sequential_duration > 0.0 {
            (sequential_duration - parallel_duration) / sequential_duration * 100.0
        } else {
            0.0
        };

        PlanStatistics {
            total_phases: plan.phases.len(),
            total_agents,
            parallel_agents,
            parallelization_rate,
            sequential_duration,
            parallel_duration,
            efficiency_gain,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{AgentProfile, ExecutionPhase, PhaseNumber};
    use std::collections::BTreeSet;

    fn phase(
        registry: &AgentRegistry,
        group: u32,
        agents: &[&str],
        mode: ExecutionMode,
    ) -> ExecutionPhase {
        let durations = agents.iter().map(|a| registry.get_profile(a).duration_estimate);
        let estimated_duration = match mode {
            ExecutionMode::ParallelSafe => durations.fold(0.0, f64::max),
            _ => durations.sum(),
        };
        ExecutionPhase {
            number: PhaseNumber::new(group),
            agents: agents.iter().map(|a| a.to_string()).collect(),
            execution_mode: mode,
            estimated_duration,
            dependencies_satisfied: Vec::new(),
            resource_locks_needed: BTreeSet::new(),
        }
    }

    fn plan(phases: Vec<ExecutionPhase>) -> ExecutionPlan {
        ExecutionPlan {
            phases,
            scenario: "test".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_pipeline_plan() {
        let registry = AgentRegistry::standard();
        let plan = plan(vec![
            phase(&registry, 1, &["analyzer"], ExecutionMode::Sequential),
            phase(&registry, 2, &["architect"], ExecutionMode::Sequential),
            phase(&registry, 3, &["modifier"], ExecutionMode::Sequential),
            phase(&registry, 4, &["tester", "reviewer"], ExecutionMode::ParallelSafe),
        ]);

        let result = PlanValidator::with_defaults(&registry).validate(&plan);
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.optimization_suggestions, [LOW_PARALLELISM_SUGGESTION]);
    }

    #[test]
    fn test_dependency_in_same_phase_is_error() {
        let registry = AgentRegistry::standard();
        let plan = plan(vec![phase(
            &registry,
            1,
            &["analyzer", "architect"],
            ExecutionMode::Hybrid,
        )]);

        let result = PlanValidator::with_defaults(&registry).validate(&plan);
        assert!(!result.valid);
        assert_eq!(result.issues_of_type(IssueType::DependencyOrder).len(), 1);
        assert!(result.errors[0].contains("architect"));
    }

    #[test]
    fn test_dependency_outside_plan_is_satisfied() {
        let registry = AgentRegistry::standard();
        let plan = plan(vec![phase(&registry, 1, &["tester"], ExecutionMode::Sequential)]);
        assert!(PlanValidator::with_defaults(&registry).validate(&plan).valid);
    }

    #[test]
    fn test_parallel_conflict_reported_once_per_pair() {
        let registry = AgentRegistry::from_profiles([
            AgentProfile::new("x", 1.0)
                .with_parallel_safe(true)
                .with_conflicts(["y"]),
            AgentProfile::new("y", 1.0)
                .with_parallel_safe(true)
                .with_conflicts(["x"]),
        ])
        .unwrap();
        let plan = plan(vec![phase(&registry, 1, &["x", "y"], ExecutionMode::ParallelSafe)]);

        let result = PlanValidator::with_defaults(&registry).validate(&plan);
        assert!(!result.valid);
        assert_eq!(result.issues_of_type(IssueType::ParallelConflict).len(), 1);
    }

    #[test]
    fn test_conflict_in_sequential_phase_is_fine() {
        let registry = AgentRegistry::standard();
        let plan = plan(vec![phase(
            &registry,
            1,
            &["modifier", "tester"],
            ExecutionMode::Sequential,
        )]);
        let result = PlanValidator::with_defaults(&registry).validate(&plan);
        assert!(result.issues_of_type(IssueType::ParallelConflict).is_empty());
    }

    #[test]
    fn test_duplicate_scheduling_is_error() {
        let registry = AgentRegistry::standard();
        let plan = plan(vec![
            phase(&registry, 1, &["analyzer"], ExecutionMode::Sequential),
            phase(&registry, 2, &["analyzer"], ExecutionMode::Sequential),
        ]);
        let result = PlanValidator::with_defaults(&registry).validate(&plan);
        assert!(!result.valid);
        assert_eq!(result.errors, ["Agent analyzer is scheduled 2 times"]);
    }

    #[test]
    fn test_unknown_agents_and_diagnostics_warn() {
        let registry = AgentRegistry::standard();
        let mut plan = plan(vec![phase(&registry, 1, &["ghost"], ExecutionMode::Sequential)]);
        plan.diagnostics = vec![
            PlanDiagnostic::UnknownAgent {
                agent: "ghost".to_string(),
            },
            PlanDiagnostic::DuplicateRequest {
                agent: "ghost".to_string(),
            },
        ];

        let result = PlanValidator::with_defaults(&registry).validate(&plan);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(result.issues_of_type(IssueType::UnknownAgent).len(), 1);
        assert_eq!(result.issues_of_type(IssueType::DuplicateRequest).len(), 1);
    }

    #[test]
    fn test_blank_request_is_warning() {
        let registry = AgentRegistry::standard();
        let mut plan = plan(vec![phase(&registry, 1, &["analyzer"], ExecutionMode::Sequential)]);
        plan.diagnostics = vec![PlanDiagnostic::BlankRequest { position: 1 }];

        let result = PlanValidator::with_defaults(&registry).validate(&plan);
        assert!(result.valid);
        let blank = result.issues_of_type(IssueType::BlankRequest);
        assert_eq!(blank.len(), 1);
        assert_eq!(blank[0].severity, Severity::Warning);
        assert!(blank[0].agents.is_empty());
        assert_eq!(
            result.warnings,
            ["Request at position 1 has a blank agent name; skipped"]
        );
    }

    #[test]
    fn test_suggestion_threshold_from_config() {
        let registry = AgentRegistry::standard();
        let plan = plan(vec![phase(&registry, 1, &["analyzer"], ExecutionMode::Sequential)]);
        let config = PlannerConfig {
            parallel_phase_ratio: 0.0,
            ..Default::default()
        };
        let result = PlanValidator::new(&registry, &config).validate(&plan);
        assert!(result.optimization_suggestions.is_empty());
    }

    #[test]
    fn test_validation_is_repeatable() {
        let registry = AgentRegistry::standard();
        let plan = plan(vec![phase(&registry, 1, &["analyzer"], ExecutionMode::Sequential)]);
        let validator = PlanValidator::with_defaults(&registry);
        assert_eq!(validator.validate(&plan), validator.validate(&plan));
    }

    #[test]
    fn test_statistics_rates() {
        let registry = AgentRegistry::standard();
        let plan = plan(vec![
            phase(&registry, 1, &["analyzer", "reviewer"], ExecutionMode::ParallelSafe),
            phase(&registry, 2, &["architect"], ExecutionMode::Sequential),
            phase(&registry, 3, &["modifier"], ExecutionMode::Sequential),
        ]);

        let stats = PlanStatisticsCalculator::new(&registry).calculate(&plan);
        assert_eq!(stats.total_phases, 3);
        assert_eq!(stats.total_agents, 4);
        assert_eq!(stats.parallel_agents, 2);
        assert_eq!(stats.parallelization_rate, 50.0);
        assert_eq!(stats.sequential_duration, 160.0);
        assert_eq!(stats.parallel_duration, 135.0);
        assert_eq!(stats.time_saved(), 25.0);
        assert!(stats.efficiency_gain > 0.0);
        assert!(stats.to_string().contains("50.0%"));
    }

    #[test]
    fn test_statistics_on_empty_plan() {
        let registry = AgentRegistry::standard();
        let stats = PlanStatisticsCalculator::new(&registry).calculate(&ExecutionPlan::default());
        assert_eq!(stats.total_agents, 0);
        assert_eq!(stats.parallelization_rate, 0.0);
        assert_eq!(stats.efficiency_gain, 0.0);
    }

    #[test]
    fn test_validation_result_serializes() {
        let mut result = ValidationResult::valid();
        result.add_issue(ValidationIssue::new(
            Severity::Warning,
            IssueType::UnknownAgent,
            "Agent ghost is uncharacterized",
        ));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["issues"][0]["issue_type"], "unknown_agent");
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use cadence_planner::ExecutionPlanner;
    use proptest::prelude::*;

    const STANDARD: [&str; 6] = ["analyzer", "architect", "modifier", "tester", "reviewer", "ghost"];

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Plans of acyclic requests always validate, and statistics stay
        /// within their ranges.
        #[test]
        fn prop_planner_output_validates(
            agents in prop::sample::subsequence(STANDARD.to_vec(), 0..=6).prop_shuffle(),
        ) {
            let planner = ExecutionPlanner::standard().unwrap();
            let plan = planner.plan_agents(&agents).unwrap();

            let result = PlanValidator::with_defaults(planner.registry()).validate(&plan);
            prop_assert!(result.valid, "errors: {:?}", result.errors);

            let stats = PlanStatisticsCalculator::new(planner.registry()).calculate(&plan);
            prop_assert!((0.0..=100.0).contains(&stats.parallelization_rate));
            prop_assert!(stats.parallel_duration <= stats.sequential_duration + 1e-9);
            prop_assert!(stats.efficiency_gain >= -1e-9);
        }
    }
}
