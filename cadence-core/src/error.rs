//! Error types for Cadence operations
//!
//! Planning itself never fails on malformed agent input; it degrades and
//! records a [`crate::PlanDiagnostic`]. The errors here cover invalid
//! profiles and configuration at API boundaries and execution-time refusals.

use thiserror::Error;

/// Invalid agent profiles offered to a registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Agent profile has a blank name")]
    BlankName,

    #[error("Invalid priority for {agent}: {priority} (must be between 1 and 5)")]
    InvalidPriority { agent: String, priority: u8 },

    #[error("Invalid duration estimate for {agent}: {duration} (must be positive)")]
    InvalidDuration { agent: String, duration: String },

    #[error("Agent {agent} cannot depend on itself")]
    SelfDependency { agent: String },

    #[error("Duplicate agent profile: {name}")]
    DuplicateProfile { name: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to initialize tracing subscriber: {reason}")]
    Subscriber { reason: String },
}

/// Phase execution errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Plan rejected by validation: {}", .errors.join("; "))]
    PlanRejected { errors: Vec<String> },

    #[error("Task for agent {agent} could not be joined: {reason}")]
    TaskJoin { agent: String, reason: String },
}

/// Master error type for all Cadence errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CadenceError {
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

/// Result type alias for Cadence operations.
pub type CadenceResult<T> = Result<T, CadenceError>;

// =============================================================================
// TESTS
// =============================================================================
