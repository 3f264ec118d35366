//! Cadence Executor - Reference Phase Executor
//!
//! Drives a validated [`cadence_core::ExecutionPlan`] through an
//! [`AgentRunner`] on tokio:
//! - Parallel-safe phases on a bounded `JoinSet`
//! - Per-resource locks held for the whole phase
//! - Per-agent timeouts
//! - Cancellation and early abort under elevated risk

pub mod executor;
pub mod locks;
pub mod report;
pub mod runner;

pub use executor::PhaseExecutor;
pub use locks::{ResourceGuard, ResourceLocks};
pub use report::{ExecutionReport, PhaseReport};
pub use runner::{AgentInvocation, AgentOutcome, AgentRunner, CancellationSignal};
