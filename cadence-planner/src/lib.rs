//! Cadence Planner - Dependency-Aware Phase Planning
//!
//! Schedules named agents into ordered execution phases:
//! - Dependency graph restricted to the request
//! - Kahn ordering with request-order tie breaks and a cycle fallback
//! - Greedy, conflict-aware phase grouping
//! - Hybrid phase splitting and conflict reporting
//! - Complexity and risk aware duration estimates
//!
//! The planner never executes agents and performs no I/O.

pub mod duration;
pub mod graph;
pub mod grouper;
pub mod optimizer;
pub mod planner;
pub mod telemetry;
pub mod topo;

pub use duration::DurationEstimator;
pub use graph::{DependencyGraph, DependencyGraphBuilder};
pub use grouper::{Grouping, PhaseGrouper};
pub use optimizer::{ConflictResolver, PhaseOptimizer};
pub use planner::ExecutionPlanner;
pub use telemetry::init_tracing;
pub use topo::{TopologicalOrder, TopologicalScheduler};

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
