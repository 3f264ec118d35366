//! Execution plan types produced by the planner and consumed by executors.

use crate::{ConflictResolution, ConflictSeverity, ExecutionMode, TaskComplexity, TaskRisk};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// REQUESTS
// ============================================================================

/// One requested agent, in caller order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentRequest {
    /// Agent name, looked up in the registry
    pub agent: String,
    /// Free-form metadata forwarded to the runner, never used for scheduling
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl AgentRequest {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

impl From<&str> for AgentRequest {
    fn from(agent: &str) -> Self {
        Self::new(agent)
    }
}

impl From<String> for AgentRequest {
    fn from(agent: String) -> Self {
        Self::new(agent)
    }
}

/// Complexity and risk the durations of a plan were scaled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EstimateProfile {
    pub complexity: TaskComplexity,
    pub risk: TaskRisk,
}

impl EstimateProfile {
    pub fn new(complexity: TaskComplexity, risk: TaskRisk) -> Self {
        Self { complexity, risk }
    }

    /// Combined duration factor.
    pub fn factor(&self) -> f64 {
        self.complexity.multiplier() * self.risk.multiplier()
    }
}

// ============================================================================
// PHASES
// ============================================================================

/// Position of a phase in a plan.
///
/// `group` is the grouper's 1-based phase index. When a mixed phase is split,
/// its sequential remainder keeps the group and gets `sub = 1`, so ordering
/// never depends on floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PhaseNumber {
    pub group: u32,
    pub sub: u32,
}

impl PhaseNumber {
    pub fn new(group: u32) -> Self {
        Self { group, sub: 0 }
    }

    /// The sub-phase directly following this one within the same group.
    pub fn next_sub(&self) -> Self {
        Self {
            group: self.group,
            sub: self.sub + 1,
        }
    }

    /// Legacy fractional label (`2.0`, `2.5`).
    pub fn as_f64(&self) -> f64 {
        self.group as f64 + self.sub as f64 * 0.5
    }
}

impl fmt::Display for PhaseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub == 0 {
            write!(f, "{}", self.group)
        } else {
            write!(f, "{:.1}", self.as_f64())
        }
    }
}

/// A group of agents that start together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ExecutionPhase {
    pub number: PhaseNumber,
    /// Agents in scheduling order
    pub agents: Vec<String>,
    pub execution_mode: ExecutionMode,
    /// Estimated wall time in seconds
    pub estimated_duration: f64,
    /// Agents guaranteed complete before this phase starts, in completion order
    pub dependencies_satisfied: Vec<String>,
    /// Resource tags an executor may lock for the phase
    pub resource_locks_needed: BTreeSet<String>,
}

impl ExecutionPhase {
    pub fn contains(&self, agent: &str) -> bool {
        self.agents.iter().any(|a| a == agent)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Non-fatal finding recorded while building a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanDiagnostic {
    /// Name absent from the registry; planned with the default profile
    UnknownAgent { agent: String },
    /// Dependency cycle; listed agents were ordered by request position
    CyclicDependency { agents: Vec<String> },
    /// The grouper could not place these agents by dependency order
    UnresolvableRemainder { agents: Vec<String> },
    /// Agent requested more than once; later occurrences dropped
    DuplicateRequest { agent: String },
    /// Request entry with a blank agent name; skipped
    BlankRequest { position: usize },
}

impl fmt::Display for PlanDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanDiagnostic::UnknownAgent { agent } => {
                write!(f, "Agent {} is uncharacterized; using default profile", agent)
            }
            PlanDiagnostic::CyclicDependency { agents } => write!(
                f,
                "Circular dependency detected among [{}]; using fallback ordering",
                agents.join(", ")
            ),
            PlanDiagnostic::UnresolvableRemainder { agents } => write!(
                f,
                "Cannot resolve dependency order for remaining agents: [{}]",
                agents.join(", ")
            ),
            PlanDiagnostic::DuplicateRequest { agent } => {
                write!(f, "Agent {} requested more than once; scheduled once", agent)
            }
            PlanDiagnostic::BlankRequest { position } => {
                write!(f, "Request at position {} has a blank agent name; skipped", position)
            }
        }
    }
}

/// Declared conflict between two requested agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ResourceConflict {
    pub agent_a: String,
    pub agent_b: String,
    /// Resource tags both agents require
    pub shared_resources: BTreeSet<String>,
    pub severity: ConflictSeverity,
    pub resolution: ConflictResolution,
}

impl ResourceConflict {
    pub fn involves(&self, agent: &str) -> bool {
        self.agent_a == agent || self.agent_b == agent
    }
}

// ============================================================================
// PLAN
// ============================================================================

/// Ordered phases plus everything the planner noticed while building them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ExecutionPlan {
    pub phases: Vec<ExecutionPhase>,
    /// Scenario label (hinted or detected); informational only
    pub scenario: String,
    pub estimate: EstimateProfile,
    #[serde(default)]
    pub diagnostics: Vec<PlanDiagnostic>,
    /// Agents the grouper could not place by dependency order
    #[serde(default)]
    pub unresolved: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<ResourceConflict>,
}

impl ExecutionPlan {
    /// Sum of phase durations. Phases never overlap.
    pub fn total_duration(&self) -> f64 {
        self.phases.iter().map(|p| p.estimated_duration).sum()
    }

    /// Every scheduled agent in phase order.
    pub fn agents(&self) -> impl Iterator<Item = &String> {
        self.phases.iter().flat_map(|p| p.agents.iter())
    }

    pub fn agent_count(&self) -> usize {
        self.phases.iter().map(ExecutionPhase::len).sum()
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.phases.iter().any(|p| p.contains(agent))
    }

    /// Index of the first phase holding `agent`.
    pub fn phase_index_of(&self, agent: &str) -> Option<usize> {
        self.phases.iter().position(|p| p.contains(agent))
    }

    pub fn phase_of(&self, agent: &str) -> Option<&ExecutionPhase> {
        self.phases.iter().find(|p| p.contains(agent))
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn has_cycle(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, PlanDiagnostic::CyclicDependency { .. }))
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "EXECUTION PLAN ({})", self.scenario)?;
        writeln!(f, "{}", "=".repeat(60))?;

        for phase in &self.phases {
            writeln!(f)?;
            writeln!(
                f,
                "Phase {} - {}",
                phase.number,
                phase.execution_mode.as_str().to_uppercase()
            )?;
            writeln!(f, "   Agents: {}", phase.agents.join(", "))?;
            writeln!(f, "   Duration: {:.1}s", phase.estimated_duration)?;
            if phase.dependencies_satisfied.is_empty() {
                writeln!(f, "   Dependencies: None")?;
            } else {
                writeln!(f, "   Dependencies: {}", phase.dependencies_satisfied.join(", "))?;
            }
        }

        for diagnostic in &self.diagnostics {
            writeln!(f)?;
            write!(f, "Warning: {}", diagnostic)?;
        }

        writeln!(f)?;
        writeln!(f, "Total Estimated Duration: {:.1}s", self.total_duration())?;
        write!(f, "{}", "=".repeat(60))
    }
}
