//! Enum types shared across the planner crates.
//!
//! Enums expose a stable string form (`as_str`) plus `Display`; the ones
//! that arrive as caller input also parse leniently through `FromStr`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// CAPABILITIES
// ============================================================================

/// Capability tag declared by an agent profile.
///
/// Capabilities are an open set: well-known tags get their own variant,
/// anything else is carried verbatim in [`Capability::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Capability {
    /// Reads project files without touching them
    ReadOnly,
    /// Creates new files
    FileCreation,
    /// Modifies existing files
    FileModification,
    /// Analyzes code or project structure
    Analysis,
    /// Designs system structure
    Architecture,
    /// Generates code
    CodeGeneration,
    /// Runs tests
    Testing,
    /// Reviews code quality
    Review,
    /// Any tag not known ahead of time
    Custom(String),
}

impl Capability {
    pub fn as_str(&self) -> &str {
        match self {
            Capability::ReadOnly => "read_only",
            Capability::FileCreation => "file_creation",
            Capability::FileModification => "file_modification",
            Capability::Analysis => "analysis",
            Capability::Architecture => "architecture",
            Capability::CodeGeneration => "code_generation",
            Capability::Testing => "testing",
            Capability::Review => "review",
            Capability::Custom(tag) => tag.as_str(),
        }
    }

    /// Whether this capability writes to the file system.
    pub fn is_write(&self) -> bool {
        matches!(self, Capability::FileCreation | Capability::FileModification)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().replace('-', "_").as_str() {
            "read_only" | "readonly" => Capability::ReadOnly,
            "file_creation" => Capability::FileCreation,
            "file_modification" => Capability::FileModification,
            "analysis" => Capability::Analysis,
            "architecture" => Capability::Architecture,
            "code_generation" => Capability::CodeGeneration,
            "testing" => Capability::Testing,
            "review" => Capability::Review,
            _ => Capability::Custom(s.to_string()),
        })
    }
}

impl From<String> for Capability {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(capability) => capability,
            Err(never) => match never {},
        }
    }
}

impl From<Capability> for String {
    fn from(capability: Capability) -> Self {
        capability.as_str().to_string()
    }
}

// ============================================================================
// EXECUTION MODE
// ============================================================================

/// How the agents of a phase are run by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One agent after another
    Sequential,
    /// All agents concurrently, no conflicts among them
    ParallelSafe,
    /// Mixed phase: some agents are not parallel-safe
    Hybrid,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::ParallelSafe => "parallel_safe",
            ExecutionMode::Hybrid => "hybrid",
        }
    }

    pub fn from_str_lenient(s: &str) -> Result<Self, ExecutionModeParseError> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel_safe" | "parallel" => Ok(ExecutionMode::ParallelSafe),
            "hybrid" => Ok(ExecutionMode::Hybrid),
            _ => Err(ExecutionModeParseError(s.to_string())),
        }
    }

    /// Whether agents in a phase of this mode run concurrently.
    pub fn is_concurrent(&self) -> bool {
        matches!(self, ExecutionMode::ParallelSafe)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = ExecutionModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_lenient(s)
    }
}

/// Error when parsing an invalid execution mode string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionModeParseError(pub String);

impl fmt::Display for ExecutionModeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid execution mode: {}", self.0)
    }
}

impl std::error::Error for ExecutionModeParseError {}

// ============================================================================
// COMPLEXITY & RISK
// ============================================================================

/// Complexity of the task the agents are planned for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    /// Two files or fewer, simple changes
    Micro,
    /// A handful of files, standard features
    #[default]
    Medium,
    /// Many files across modules
    Complex,
    /// Security, auth, database work
    Critical,
}

impl TaskComplexity {
    pub const ALL: [TaskComplexity; 4] = [
        TaskComplexity::Micro,
        TaskComplexity::Medium,
        TaskComplexity::Complex,
        TaskComplexity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskComplexity::Micro => "micro",
            TaskComplexity::Medium => "medium",
            TaskComplexity::Complex => "complex",
            TaskComplexity::Critical => "critical",
        }
    }

    /// Factor applied to profile duration estimates. Non-decreasing in severity.
    pub fn multiplier(&self) -> f64 {
        match self {
            TaskComplexity::Micro => 0.75,
            TaskComplexity::Medium => 1.0,
            TaskComplexity::Complex => 1.5,
            TaskComplexity::Critical => 2.0,
        }
    }

    pub fn from_str_lenient(s: &str) -> Result<Self, TaskComplexityParseError> {
        match s.to_lowercase().as_str() {
            "micro" | "low" | "simple" => Ok(TaskComplexity::Micro),
            "medium" => Ok(TaskComplexity::Medium),
            "complex" | "high" => Ok(TaskComplexity::Complex),
            "critical" => Ok(TaskComplexity::Critical),
            _ => Err(TaskComplexityParseError(s.to_string())),
        }
    }
}

impl fmt::Display for TaskComplexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskComplexity {
    type Err = TaskComplexityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_lenient(s)
    }
}

/// Error when parsing an invalid complexity string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskComplexityParseError(pub String);

impl fmt::Display for TaskComplexityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid task complexity: {}", self.0)
    }
}

impl std::error::Error for TaskComplexityParseError {}

/// Risk classification of the task. Drives both duration padding and the
/// executor's failure policy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum TaskRisk {
    /// UI, docs, text changes
    #[default]
    Low,
    /// Standard features
    Medium,
    /// Architecture, large refactors
    High,
    /// Security, auth, payments
    Critical,
}

impl TaskRisk {
    pub const ALL: [TaskRisk; 4] = [
        TaskRisk::Low,
        TaskRisk::Medium,
        TaskRisk::High,
        TaskRisk::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskRisk::Low => "low",
            TaskRisk::Medium => "medium",
            TaskRisk::High => "high",
            TaskRisk::Critical => "critical",
        }
    }

    /// Factor applied to profile duration estimates. Non-decreasing in severity.
    pub fn multiplier(&self) -> f64 {
        match self {
            TaskRisk::Low => 1.0,
            TaskRisk::Medium => 1.1,
            TaskRisk::High => 1.25,
            TaskRisk::Critical => 1.5,
        }
    }

    /// High and critical risk abort a run on the first failure.
    pub fn is_elevated(&self) -> bool {
        matches!(self, TaskRisk::High | TaskRisk::Critical)
    }

    pub fn from_str_lenient(s: &str) -> Result<Self, TaskRiskParseError> {
        match s.to_lowercase().as_str() {
            "low" => Ok(TaskRisk::Low),
            "medium" => Ok(TaskRisk::Medium),
            "high" => Ok(TaskRisk::High),
            "critical" => Ok(TaskRisk::Critical),
            _ => Err(TaskRiskParseError(s.to_string())),
        }
    }
}

impl fmt::Display for TaskRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskRisk {
    type Err = TaskRiskParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_lenient(s)
    }
}

/// Error when parsing an invalid risk string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRiskParseError(pub String);

impl fmt::Display for TaskRiskParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid task risk: {}", self.0)
    }
}

impl std::error::Error for TaskRiskParseError {}

// ============================================================================
// CONFLICTS
// ============================================================================

/// How serious a declared conflict between two agents is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

impl ConflictSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictSeverity::Low => "low",
            ConflictSeverity::Medium => "medium",
            ConflictSeverity::High => "high",
        }
    }
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a conflict is kept from materializing at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// The agents never share a concurrent phase
    Sequential,
    /// The agents touch disjoint resources; isolating them is enough
    ResourceIsolation,
}

impl ConflictResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictResolution::Sequential => "sequential",
            ConflictResolution::ResourceIsolation => "resource_isolation",
        }
    }
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
