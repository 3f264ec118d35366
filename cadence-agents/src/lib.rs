//! Cadence Agents - Agent Profile Registry
//!
//! Provides the capability table the planner schedules against:
//! - Agent profile registration and validation
//! - Lookup with a default profile for uncharacterized agents
//! - Symmetric conflict queries
//! - Scenario catalog and scenario detection

use cadence_core::{
    AgentProfile, CadenceResult, Capability, ConfigError, ProfileError, NOMINAL_DURATION_SECS,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// REGISTRY
// ============================================================================

/// Catalog of agent profiles, keyed by agent name.
///
/// Built once and then only read. Lookups of unknown names never fail; they
/// yield an uncharacterized profile so that new agents stay plannable.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRegistry {
    profiles: BTreeMap<String, AgentProfile>,
    default_duration_secs: f64,
    scenarios: Vec<ScenarioDefinition>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl AgentRegistry {
    /// Registry with no profiles and no scenarios.
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
            default_duration_secs: NOMINAL_DURATION_SECS,
            scenarios: Vec::new(),
        }
    }

    /// Registry pre-populated with the built-in development pipeline:
    /// analyzer, architect, modifier, tester, reviewer.
    pub fn standard() -> Self {
        let mut profiles = BTreeMap::new();
        for profile in standard_profiles() {
            profiles.insert(profile.name.clone(), profile);
        }
        Self {
            profiles,
            default_duration_secs: NOMINAL_DURATION_SECS,
            scenarios: standard_scenarios(),
        }
    }

    /// Build a registry from caller-supplied profiles.
    pub fn from_profiles<I>(profiles: I) -> CadenceResult<Self>
    where
        I: IntoIterator<Item = AgentProfile>,
    {
        profiles
            .into_iter()
            .try_fold(Self::empty(), |registry, profile| registry.with_profile(profile))
    }

    /// Register one more profile. Rejects invalid and duplicate profiles.
    pub fn with_profile(mut self, profile: AgentProfile) -> CadenceResult<Self> {
        profile.validate()?;
        if self.profiles.contains_key(&profile.name) {
            return Err(ProfileError::DuplicateProfile { name: profile.name }.into());
        }
        self.profiles.insert(profile.name.clone(), profile);
        Ok(self)
    }

    /// Set the duration handed to uncharacterized agents.
    pub fn with_default_duration(mut self, seconds: f64) -> CadenceResult<Self> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "default_duration_secs".to_string(),
                value: seconds.to_string(),
                reason: "default_duration_secs must be positive".to_string(),
            }
            .into());
        }
        self.default_duration_secs = seconds;
        Ok(self)
    }

    /// Add a named scenario to the catalog.
    pub fn with_scenario(mut self, scenario: ScenarioDefinition) -> Self {
        self.scenarios.retain(|s| s.name != scenario.name);
        self.scenarios.push(scenario);
        self
    }

    /// Profile registered under `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&AgentProfile> {
        self.profiles.get(name)
    }

    /// Profile for `name`, falling back to the uncharacterized default.
    pub fn get_profile(&self, name: &str) -> Cow<'_, AgentProfile> {
        match self.profiles.get(name) {
            Some(profile) => Cow::Borrowed(profile),
            None => Cow::Owned(AgentProfile::uncharacterized(
                name,
                self.default_duration_secs,
            )),
        }
    }

    pub fn is_known(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Whether `a` and `b` must never run concurrently.
    ///
    /// A conflict declared on either side counts for both.
    pub fn conflicts(&self, a: &str, b: &str) -> bool {
        if a == b {
            return false;
        }
        let declared = |from: &str, to: &str| {
            self.profiles
                .get(from)
                .is_some_and(|p| p.declares_conflict_with(to))
        };
        declared(a, b) || declared(b, a)
    }

    /// Whether `name` is parallel-safe (uncharacterized agents are not).
    pub fn is_parallel_safe(&self, name: &str) -> bool {
        self.profiles.get(name).is_some_and(|p| p.parallel_safe)
    }

    pub fn default_duration_secs(&self) -> f64 {
        self.default_duration_secs
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &AgentProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn scenarios(&self) -> &[ScenarioDefinition] {
        &self.scenarios
    }

    /// Label the agent combination for logging.
    ///
    /// Exact matches against the scenario catalog win; otherwise the
    /// combination is classified by shape.
    pub fn detect_scenario<S: AsRef<str>>(&self, agents: &[S]) -> String {
        if agents.is_empty() {
            return SCENARIO_EMPTY.to_string();
        }

        let requested: BTreeSet<&str> = agents.iter().map(AsRef::as_ref).collect();
        if let Some(scenario) = self
            .scenarios
            .iter()
            .find(|s| s.agents.iter().map(String::as_str).collect::<BTreeSet<_>>() == requested)
        {
            return scenario.name.clone();
        }

        if requested.len() == 1 {
            return SCENARIO_SINGLE_AGENT.to_string();
        }

        let known: Vec<&AgentProfile> = requested.iter().filter_map(|a| self.lookup(a)).collect();
        if !known.is_empty() && known.iter().all(|p| p.parallel_safe) {
            return SCENARIO_PARALLEL_READONLY.to_string();
        }

        if requested.contains("modifier") && requested.contains("tester") {
            return SCENARIO_FULL_IMPLEMENTATION.to_string();
        }

        SCENARIO_CUSTOM.to_string()
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

pub const SCENARIO_EMPTY: &str = "empty";
pub const SCENARIO_SINGLE_AGENT: &str = "single_agent";
pub const SCENARIO_PARALLEL_READONLY: &str = "parallel_readonly";
pub const SCENARIO_FULL_IMPLEMENTATION: &str = "full_implementation";
pub const SCENARIO_CUSTOM: &str = "custom_scenario";

/// A named, well-known agent combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    pub name: String,
    pub agents: BTreeSet<String>,
    /// Free-text strategy label, informational
    pub strategy: String,
}

impl ScenarioDefinition {
    pub fn new<I, S>(name: impl Into<String>, agents: I, strategy: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            agents: agents.into_iter().map(Into::into).collect(),
            strategy: strategy.into(),
        }
    }
}

fn standard_scenarios() -> Vec<ScenarioDefinition> {
    vec![
        ScenarioDefinition::new("simple_analysis", ["analyzer"], "single_agent"),
        ScenarioDefinition::new("quick_review", ["analyzer", "reviewer"], "parallel_readonly"),
        ScenarioDefinition::new(
            SCENARIO_FULL_IMPLEMENTATION,
            ["analyzer", "architect", "modifier", "tester", "reviewer"],
            "smart_pipeline",
        ),
        ScenarioDefinition::new("code_generation", ["analyzer", "modifier"], "sequential_creation"),
    ]
}

// ============================================================================
// STANDARD CATALOG
// ============================================================================

fn standard_profiles() -> Vec<AgentProfile> {
    vec![
        AgentProfile::new("analyzer", 30.0)
            .with_capabilities([Capability::ReadOnly, Capability::Analysis])
            .with_resources(["project_files"])
            .with_parallel_safe(true)
            .with_priority(2),
        // Architecture should be planned alone
        AgentProfile::new("architect", 45.0)
            .with_capabilities([Capability::Architecture, Capability::Analysis])
            .with_dependencies(["analyzer"])
            .with_resources(["project_files"])
            .with_priority(4),
        AgentProfile::new("modifier", 60.0)
            .with_capabilities([
                Capability::FileCreation,
                Capability::FileModification,
                Capability::CodeGeneration,
            ])
            .with_dependencies(["architect"])
            .with_conflicts(["tester"])
            .with_resources(["file_system_write"])
            .with_priority(3),
        AgentProfile::new("tester", 35.0)
            .with_capabilities([Capability::Testing])
            .with_dependencies(["modifier"])
            .with_conflicts(["modifier"])
            .with_resources(["file_system_read", "test_environment"])
            .with_parallel_safe(true)
            .with_priority(2),
        AgentProfile::new("reviewer", 25.0)
            .with_capabilities([Capability::ReadOnly, Capability::Review])
            .with_dependencies(["modifier"])
            .with_resources(["project_files"])
            .with_parallel_safe(true)
            .with_priority(1),
    ]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::CadenceError;

    #[test]
    fn test_standard_registry_contents() {
        let registry = AgentRegistry::standard();
        assert_eq!(registry.len(), 5);
        for name in ["analyzer", "architect", "modifier", "tester", "reviewer"] {
            assert!(registry.is_known(name), "missing {name}");
        }
        assert!(registry.lookup("analyzer").unwrap().depends_on.is_empty());
        assert!(registry.lookup("architect").unwrap().depends_on.contains("analyzer"));
        assert_eq!(registry.lookup("modifier").unwrap().duration_estimate, 60.0);
        for profile in registry.profiles() {
            assert!(profile.validate().is_ok());
        }
    }

    #[test]
    fn test_unknown_agent_gets_default_profile() {
        let registry = AgentRegistry::standard();
        let profile = registry.get_profile("security_agent");

        assert!(matches!(profile, Cow::Owned(_)));
        assert_eq!(profile.name, "security_agent");
        assert!(profile.depends_on.is_empty());
        assert!(profile.conflicts_with.is_empty());
        assert!(!profile.parallel_safe);
        assert_eq!(profile.duration_estimate, NOMINAL_DURATION_SECS);
        assert!(!registry.is_known("security_agent"));
    }

    #[test]
    fn test_known_agent_is_borrowed() {
        let registry = AgentRegistry::standard();
        assert!(matches!(registry.get_profile("tester"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_conflicts_are_symmetric() {
        let registry = AgentRegistry::from_profiles([
            AgentProfile::new("writer", 10.0).with_conflicts(["deleter"]),
            AgentProfile::new("deleter", 10.0),
        ])
        .unwrap();

        assert!(registry.conflicts("writer", "deleter"));
        assert!(registry.conflicts("deleter", "writer"));
        assert!(!registry.conflicts("writer", "writer"));
        assert!(!registry.conflicts("writer", "ghost"));
    }

    #[test]
    fn test_duplicate_profile_rejected() {
        let err = AgentRegistry::from_profiles([
            AgentProfile::new("a", 1.0),
            AgentProfile::new("a", 2.0),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            CadenceError::Profile(ProfileError::DuplicateProfile {
                name: "a".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let err = AgentRegistry::empty()
            .with_profile(AgentProfile::new("slow", -1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            CadenceError::Profile(ProfileError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_default_duration_override() {
        let registry = AgentRegistry::empty().with_default_duration(12.0).unwrap();
        assert_eq!(registry.get_profile("anything").duration_estimate, 12.0);
        assert!(AgentRegistry::empty().with_default_duration(0.0).is_err());
    }

    #[test]
    fn test_detect_known_scenarios() {
        let registry = AgentRegistry::standard();
        assert_eq!(registry.detect_scenario(&["analyzer"]), "simple_analysis");
        assert_eq!(registry.detect_scenario(&["reviewer", "analyzer"]), "quick_review");
        assert_eq!(
            registry.detect_scenario(&["analyzer", "architect", "modifier", "tester", "reviewer"]),
            "full_implementation"
        );
        assert_eq!(registry.detect_scenario(&["analyzer", "modifier"]), "code_generation");
    }

    #[test]
    fn test_detect_classified_scenarios() {
        let registry = AgentRegistry::standard();
        let none: [&str; 0] = [];
        assert_eq!(registry.detect_scenario(&none), SCENARIO_EMPTY);
        assert_eq!(registry.detect_scenario(&["tester"]), SCENARIO_SINGLE_AGENT);
        assert_eq!(
            registry.detect_scenario(&["tester", "reviewer"]),
            SCENARIO_PARALLEL_READONLY
        );
        assert_eq!(
            registry.detect_scenario(&["modifier", "tester"]),
            SCENARIO_FULL_IMPLEMENTATION
        );
        assert_eq!(
            registry.detect_scenario(&["architect", "ghost"]),
            SCENARIO_CUSTOM
        );
    }

    #[test]
    fn test_only_unknown_agents_are_custom() {
        let registry = AgentRegistry::standard();
        assert_eq!(
            registry.detect_scenario(&["ghost", "phantom"]),
            SCENARIO_CUSTOM
        );
    }

    #[test]
    fn test_scenario_definition_serde() {
        let scenario =
            ScenarioDefinition::new("quick_review", ["reviewer", "analyzer"], "parallel_readonly");
        let json = serde_json::to_value(&scenario).unwrap();
        assert_eq!(json["name"], "quick_review");
        assert_eq!(json["agents"], serde_json::json!(["analyzer", "reviewer"]));

        let decoded: ScenarioDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, scenario);
    }

    #[test]
    fn test_with_scenario_replaces_by_name() {
        let registry = AgentRegistry::standard().with_scenario(ScenarioDefinition::new(
            "quick_review",
            ["reviewer"],
            "solo",
        ));
        assert_eq!(registry.scenarios().len(), 4);
        assert_eq!(registry.detect_scenario(&["reviewer"]), "quick_review");
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_agent_name() -> impl Strategy<Value = String> {
        "[a-z]{3,10}".prop_filter("not a standard agent", |name| {
            !AgentRegistry::standard().is_known(name)
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Unknown names always resolve, never inherit relations, and keep
        /// their own name.
        #[test]
        fn prop_unknown_lookup_is_total(name in arb_agent_name()) {
            let registry = AgentRegistry::standard();
            let profile = registry.get_profile(&name);
            prop_assert_eq!(&profile.name, &name);
            prop_assert!(profile.depends_on.is_empty());
            prop_assert!(!registry.is_parallel_safe(&name));
            prop_assert!(registry.lookup(&name).is_none());
        }

        /// Conflict queries are symmetric for any pair of names.
        #[test]
        fn prop_conflicts_symmetric(
            a in prop::sample::select(vec!["analyzer", "architect", "modifier", "tester", "reviewer", "ghost"]),
            b in prop::sample::select(vec!["analyzer", "architect", "modifier", "tester", "reviewer", "ghost"]),
        ) {
            let registry = AgentRegistry::standard();
            prop_assert_eq!(registry.conflicts(a, b), registry.conflicts(b, a));
        }
    }
}
