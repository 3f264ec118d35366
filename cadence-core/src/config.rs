//! Configuration types

use crate::{CadenceError, CadenceResult, ConfigError, NOMINAL_DURATION_SECS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// PLANNER
// ============================================================================

/// What the grouper does with agents it cannot place by dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedPolicy {
    /// Append them as one trailing sequential phase
    #[default]
    TrailingSequential,
    /// Stop and return the partial plan
    Halt,
}

impl UnresolvedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnresolvedPolicy::TrailingSequential => "trailing_sequential",
            UnresolvedPolicy::Halt => "halt",
        }
    }
}

impl fmt::Display for UnresolvedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnresolvedPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "trailing_sequential" | "trailing" => Ok(UnresolvedPolicy::TrailingSequential),
            "halt" => Ok(UnresolvedPolicy::Halt),
            _ => Err(ConfigError::InvalidValue {
                field: "unresolved_policy".to_string(),
                value: s.to_string(),
                reason: "expected trailing_sequential or halt".to_string(),
            }),
        }
    }
}

/// Planner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Duration assumed for agents missing from the registry, in seconds
    pub default_duration_secs: f64,
    /// Below this share of parallel-safe phases the validator suggests
    /// revisiting agent profiles
    pub parallel_phase_ratio: f64,
    pub unresolved_policy: UnresolvedPolicy,
    /// Split hybrid phases into a parallel-safe and a sequential sub-phase
    pub split_hybrid_phases: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: NOMINAL_DURATION_SECS,
            parallel_phase_ratio: 0.5,
            unresolved_policy: UnresolvedPolicy::TrailingSequential,
            split_hybrid_phases: true,
        }
    }
}

impl PlannerConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `CADENCE_DEFAULT_DURATION_SECS` (default: 30)
    /// - `CADENCE_PARALLEL_PHASE_RATIO` (default: 0.5)
    /// - `CADENCE_UNRESOLVED_POLICY`: `trailing_sequential` or `halt`
    /// - `CADENCE_SPLIT_HYBRID_PHASES` (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            default_duration_secs: env_parse("CADENCE_DEFAULT_DURATION_SECS")
                .unwrap_or(defaults.default_duration_secs),
            parallel_phase_ratio: env_parse("CADENCE_PARALLEL_PHASE_RATIO")
                .unwrap_or(defaults.parallel_phase_ratio),
            unresolved_policy: env_parse("CADENCE_UNRESOLVED_POLICY")
                .unwrap_or(defaults.unresolved_policy),
            split_hybrid_phases: env_flag("CADENCE_SPLIT_HYBRID_PHASES")
                .unwrap_or(defaults.split_hybrid_phases),
        }
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - default_duration_secs is finite and > 0
    /// - parallel_phase_ratio in [0.0, 1.0]
    pub fn validate(&self) -> CadenceResult<()> {
        if !self.default_duration_secs.is_finite() || self.default_duration_secs <= 0.0 {
            return Err(CadenceError::Config(ConfigError::InvalidValue {
                field: "default_duration_secs".to_string(),
                value: self.default_duration_secs.to_string(),
                reason: "default_duration_secs must be positive".to_string(),
            }));
        }

        if !(0.0..=1.0).contains(&self.parallel_phase_ratio) {
            return Err(CadenceError::Config(ConfigError::InvalidValue {
                field: "parallel_phase_ratio".to_string(),
                value: self.parallel_phase_ratio.to_string(),
                reason: "parallel_phase_ratio must be between 0.0 and 1.0".to_string(),
            }));
        }

        Ok(())
    }
}

// ============================================================================
// EXECUTOR
// ============================================================================

/// Phase executor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Upper bound on concurrently running agents in a parallel phase
    pub max_concurrent_agents: usize,
    /// Per-agent time limit; a timed out agent counts as failed
    pub agent_timeout: Duration,
    /// Hold one lock per resource tag for the duration of a phase
    pub acquire_resource_locks: bool,
    /// On failure under high or critical risk, cancel siblings and skip the rest
    pub cancel_on_elevated_risk: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_agents: 4,
            agent_timeout: Duration::from_secs(600),
            acquire_resource_locks: true,
            cancel_on_elevated_risk: true,
        }
    }
}

impl ExecutorConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `CADENCE_MAX_CONCURRENT_AGENTS` (default: 4)
    /// - `CADENCE_AGENT_TIMEOUT_SECS` (default: 600)
    /// - `CADENCE_ACQUIRE_RESOURCE_LOCKS` (default: true)
    /// - `CADENCE_CANCEL_ON_ELEVATED_RISK` (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            max_concurrent_agents: env_parse("CADENCE_MAX_CONCURRENT_AGENTS")
                .unwrap_or(defaults.max_concurrent_agents),
            agent_timeout: env_parse("CADENCE_AGENT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.agent_timeout),
            acquire_resource_locks: env_flag("CADENCE_ACQUIRE_RESOURCE_LOCKS")
                .unwrap_or(defaults.acquire_resource_locks),
            cancel_on_elevated_risk: env_flag("CADENCE_CANCEL_ON_ELEVATED_RISK")
                .unwrap_or(defaults.cancel_on_elevated_risk),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> CadenceResult<()> {
        if self.max_concurrent_agents == 0 {
            return Err(CadenceError::Config(ConfigError::InvalidValue {
                field: "max_concurrent_agents".to_string(),
                value: self.max_concurrent_agents.to_string(),
                reason: "max_concurrent_agents must be at least 1".to_string(),
            }));
        }

        if self.agent_timeout.is_zero() {
            return Err(CadenceError::Config(ConfigError::InvalidValue {
                field: "agent_timeout".to_string(),
                value: format!("{:?}", self.agent_timeout),
                reason: "agent_timeout must be positive".to_string(),
            }));
        }

        Ok(())
    }
}

// ============================================================================
// TELEMETRY
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "cadence=info,info".to_string(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Environment variables:
    /// - `CADENCE_LOG_FILTER` (default: `cadence=info,info`)
    /// - `CADENCE_LOG_JSON` (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            filter: std::env::var("CADENCE_LOG_FILTER").unwrap_or(defaults.filter),
            json: env_flag("CADENCE_LOG_JSON").unwrap_or(defaults.json),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

// =============================================================================
// TESTS
// =============================================================================
