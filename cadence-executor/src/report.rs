//! Execution reports.

use crate::runner::AgentOutcome;
use cadence_core::{ExecutionMode, PhaseNumber, TaskRisk};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Outcome of one executed phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub number: PhaseNumber,
    pub execution_mode: ExecutionMode,
    /// Outcomes in plan order
    pub outcomes: Vec<AgentOutcome>,
    /// Agents never started or cancelled before finishing
    #[serde(default)]
    pub skipped_agents: Vec<String>,
    pub elapsed: Duration,
}

impl PhaseReport {
    pub fn succeeded(&self) -> bool {
        self.skipped_agents.is_empty() && self.outcomes.iter().all(|o| o.success)
    }

    pub fn failed_agents(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.agent.as_str())
    }
}

/// Outcome of one plan execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub risk: TaskRisk,
    pub phases: Vec<PhaseReport>,
    /// Execution stopped early after a failure under elevated risk
    pub aborted: bool,
    /// Phases never started
    #[serde(default)]
    pub skipped_phases: Vec<PhaseNumber>,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> bool {
        !self.aborted
            && self.skipped_phases.is_empty()
            && self.phases.iter().all(PhaseReport::succeeded)
    }

    /// Every failed agent in phase order.
    pub fn failed_agents(&self) -> Vec<&str> {
        self.phases.iter().flat_map(|p| p.failed_agents()).collect()
    }

    pub fn outcome_of(&self, agent: &str) -> Option<&AgentOutcome> {
        self.phases
            .iter()
            .flat_map(|p| p.outcomes.iter())
            .find(|o| o.agent == agent)
    }

    /// Wall-clock time between start and finish.
    pub fn wall_time(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
