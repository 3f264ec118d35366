//! The agent runner boundary and its cancellation signal.

use async_trait::async_trait;
use cadence_core::PhaseNumber;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::watch;

// ============================================================================
// CANCELLATION
// ============================================================================

/// Cooperative cancellation flag handed to each running agent.
///
/// Runners may poll [`is_cancelled`](Self::is_cancelled) or await
/// [`cancelled`](Self::cancelled). Runners that ignore it are aborted.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    rx: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Pends forever if the
    /// sending side goes away without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Sending side of a [`CancellationSignal`], one per phase.
#[derive(Debug)]
pub(crate) struct CancellationSource {
    tx: watch::Sender<bool>,
}

impl CancellationSource {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub(crate) fn signal(&self) -> CancellationSignal {
        CancellationSignal {
            rx: self.tx.subscribe(),
        }
    }

    pub(crate) fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

// ============================================================================
// INVOCATION & OUTCOME
// ============================================================================

/// Everything a runner gets to execute one agent.
#[derive(Debug, Clone)]
pub struct AgentInvocation {
    pub agent: String,
    pub phase: PhaseNumber,
    /// Metadata from the originating request
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub cancellation: CancellationSignal,
}

/// What a runner reports back for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub agent: String,
    pub success: bool,
    /// Identifiers of produced artifacts, opaque to the executor
    #[serde(default)]
    pub artifacts: Vec<String>,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl AgentOutcome {
    pub fn succeeded(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            success: true,
            artifacts: Vec::new(),
            elapsed: Duration::ZERO,
            error: None,
        }
    }

    pub fn failed(agent: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            success: false,
            artifacts: Vec::new(),
            elapsed: Duration::ZERO,
            error: Some(error.into()),
        }
    }

    pub fn with_artifacts<I, S>(mut self, artifacts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artifacts.extend(artifacts.into_iter().map(Into::into));
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}

// ============================================================================
// RUNNER
// ============================================================================

/// Performs the actual work of an agent.
///
/// Implementations report failure through [`AgentOutcome::success`]; the
/// executor never retries.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, invocation: AgentInvocation) -> AgentOutcome;
}
