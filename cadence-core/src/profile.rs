//! Agent profiles: the static description the planner schedules against.

use crate::{Capability, ProfileError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lowest allowed profile priority.
pub const MIN_PRIORITY: u8 = 1;
/// Highest allowed profile priority.
pub const MAX_PRIORITY: u8 = 5;
/// Duration given to agents nobody has characterized yet, in seconds.
pub const NOMINAL_DURATION_SECS: f64 = 30.0;

/// Scheduling profile of a single agent.
///
/// Profiles are created once when a registry is built and are never mutated
/// afterwards; all sets are ordered so that planning is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgentProfile {
    /// Unique agent name
    pub name: String,
    /// Capability tags
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
    /// Agents that must finish before this one starts
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
    /// Agents this one must never run concurrently with
    #[serde(default)]
    pub conflicts_with: BTreeSet<String>,
    /// Resource tags this agent touches (advisory lock keys)
    #[serde(default)]
    pub resource_requirements: BTreeSet<String>,
    /// Estimated run time in seconds
    pub duration_estimate: f64,
    /// Whether the agent may share a phase with other parallel-safe agents
    #[serde(default)]
    pub parallel_safe: bool,
    /// 1 = low, 5 = critical
    pub priority: u8,
}

impl AgentProfile {
    /// Create a profile with no relations, not parallel-safe, lowest priority.
    pub fn new(name: impl Into<String>, duration_estimate: f64) -> Self {
        Self {
            name: name.into(),
            capabilities: BTreeSet::new(),
            depends_on: BTreeSet::new(),
            conflicts_with: BTreeSet::new(),
            resource_requirements: BTreeSet::new(),
            duration_estimate,
            parallel_safe: false,
            priority: MIN_PRIORITY,
        }
    }

    /// Profile handed out for names the registry has never seen.
    pub fn uncharacterized(name: impl Into<String>, duration_estimate: f64) -> Self {
        Self::new(name, duration_estimate)
    }

    pub fn with_capabilities<I>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = Capability>,
    {
        self.capabilities.extend(capabilities);
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn with_conflicts<I, S>(mut self, conflicts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflicts_with.extend(conflicts.into_iter().map(Into::into));
        self
    }

    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_requirements
            .extend(resources.into_iter().map(Into::into));
        self
    }

    pub fn with_parallel_safe(mut self, parallel_safe: bool) -> Self {
        self.parallel_safe = parallel_safe;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Check if the agent has a specific capability.
    pub fn has_capability(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Whether any capability writes to the file system.
    pub fn writes_files(&self) -> bool {
        self.capabilities.iter().any(Capability::is_write)
    }

    /// Whether this profile itself declares a conflict with `other`.
    ///
    /// Conflicts are symmetric at the registry level; this only looks at
    /// one side.
    pub fn declares_conflict_with(&self, other: &str) -> bool {
        self.conflicts_with.contains(other)
    }

    /// Validate the profile.
    ///
    /// Validates:
    /// - name is not blank
    /// - priority in [1, 5]
    /// - duration_estimate is finite and > 0
    /// - the agent does not depend on itself
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::BlankName);
        }

        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&self.priority) {
            return Err(ProfileError::InvalidPriority {
                agent: self.name.clone(),
                priority: self.priority,
            });
        }

        if !self.duration_estimate.is_finite() || self.duration_estimate <= 0.0 {
            return Err(ProfileError::InvalidDuration {
                agent: self.name.clone(),
                duration: self.duration_estimate.to_string(),
            });
        }

        if self.depends_on.contains(&self.name) {
            return Err(ProfileError::SelfDependency {
                agent: self.name.clone(),
            });
        }

        Ok(())
    }
}
