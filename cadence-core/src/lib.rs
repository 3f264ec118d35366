//! Cadence Core - Planning Data Types
//!
//! Pure data structures shared by every other crate: agent profiles, plan
//! and phase types, enums, the error taxonomy and configuration.
//! This crate contains no scheduling logic.

pub mod config;
pub mod enums;
pub mod error;
pub mod plan;
pub mod profile;

pub use config::{ExecutorConfig, PlannerConfig, TelemetryConfig, UnresolvedPolicy};
pub use enums::{
    Capability, ConflictResolution, ConflictSeverity, ExecutionMode, ExecutionModeParseError,
    TaskComplexity, TaskComplexityParseError, TaskRisk, TaskRiskParseError,
};
pub use error::{CadenceError, CadenceResult, ConfigError, ExecutionError, ProfileError};
pub use plan::{
    AgentRequest, EstimateProfile, ExecutionPhase, ExecutionPlan, PhaseNumber, PlanDiagnostic,
    ResourceConflict,
};
pub use profile::{AgentProfile, MAX_PRIORITY, MIN_PRIORITY, NOMINAL_DURATION_SECS};

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
