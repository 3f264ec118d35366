//! Phase-by-phase execution of a validated plan.

use crate::locks::ResourceLocks;
use crate::report::{ExecutionReport, PhaseReport};
use crate::runner::{
    AgentInvocation, AgentOutcome, AgentRunner, CancellationSignal, CancellationSource,
};
use cadence_audit::ValidationResult;
use cadence_core::{
    AgentRequest, CadenceResult, ExecutionError, ExecutionMode, ExecutionPhase, ExecutionPlan,
    ExecutorConfig, PhaseNumber, TaskRisk,
};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use uuid::Uuid;

type MetadataIndex<'r> = HashMap<&'r str, &'r BTreeMap<String, serde_json::Value>>;

/// Runs the phases of a plan in order through an [`AgentRunner`].
///
/// PARALLEL_SAFE phases run their agents concurrently (bounded by
/// `max_concurrent_agents`); every other phase runs them one at a time.
/// Nothing is retried.
pub struct PhaseExecutor {
    runner: Arc<dyn AgentRunner>,
    config: ExecutorConfig,
    locks: Arc<ResourceLocks>,
}

impl PhaseExecutor {
    pub fn new(runner: Arc<dyn AgentRunner>, config: ExecutorConfig) -> CadenceResult<Self> {
        config.validate()?;
        Ok(Self {
            runner,
            config,
            locks: Arc::new(ResourceLocks::new()),
        })
    }

    /// Share a lock table with other executors.
    pub fn with_locks(mut self, locks: Arc<ResourceLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn locks(&self) -> &Arc<ResourceLocks> {
        &self.locks
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `plan` without request metadata.
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        validation: &ValidationResult,
        risk: TaskRisk,
    ) -> CadenceResult<ExecutionReport> {
        self.execute_requests(plan, validation, risk, &[]).await
    }

    /// Execute `plan`, forwarding each agent's request metadata to the runner.
    ///
    /// Refuses plans whose validation failed. Under high or critical risk a
    /// failed agent cancels its running siblings and skips every later phase.
    pub async fn execute_requests(
        &self,
        plan: &ExecutionPlan,
        validation: &ValidationResult,
        risk: TaskRisk,
        requests: &[AgentRequest],
    ) -> CadenceResult<ExecutionReport> {
        if !validation.valid {
            return Err(ExecutionError::PlanRejected {
                errors: validation.errors.clone(),
            }
            .into());
        }

        let mut metadata: MetadataIndex<'_> = HashMap::with_capacity(requests.len());
        for request in requests {
            metadata
                .entry(request.agent.as_str())
                .or_insert(&request.metadata);
        }

        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let abort_on_failure = self.config.cancel_on_elevated_risk && risk.is_elevated();

        tracing::info!(
            %run_id,
            scenario = %plan.scenario,
            phases = plan.phases.len(),
            risk = risk.as_str(),
            "Execution started"
        );

        let mut phases = Vec::with_capacity(plan.phases.len());
        let mut skipped_phases = Vec::new();
        let mut aborted = false;

        for phase in &plan.phases {
            if aborted {
                skipped_phases.push(phase.number);
                continue;
            }

            let report = self.run_phase(phase, &metadata, abort_on_failure).await?;
            if abort_on_failure && !report.succeeded() {
                tracing::warn!(
                    %run_id,
                    phase = %phase.number,
                    failed = ?report.failed_agents().collect::<Vec<_>>(),
                    "Aborting execution after failure under elevated risk"
                );
                aborted = true;
            }
            phases.push(report);
        }

        let report = ExecutionReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            risk,
            phases,
            aborted,
            skipped_phases,
        };

        tracing::info!(
            %run_id,
            succeeded = report.succeeded(),
            aborted = report.aborted,
            skipped_phases = report.skipped_phases.len(),
            "Execution finished"
        );
        Ok(report)
    }

    async fn run_phase(
        &self,
        phase: &ExecutionPhase,
        metadata: &MetadataIndex<'_>,
        abort_on_failure: bool,
    ) -> CadenceResult<PhaseReport> {
        let started = Instant::now();
        let _guard = if self.config.acquire_resource_locks {
            Some(self.locks.acquire(&phase.resource_locks_needed).await)
        } else {
            None
        };

        tracing::info!(
            phase = %phase.number,
            mode = phase.execution_mode.as_str(),
            agents = ?phase.agents,
            "Phase started"
        );

        let (outcomes, skipped_agents) =
            if phase.execution_mode == ExecutionMode::ParallelSafe && phase.len() > 1 {
                self.run_parallel(phase, metadata, abort_on_failure).await?
            } else {
                self.run_sequential(phase, metadata, abort_on_failure).await
            };

        let report = PhaseReport {
            number: phase.number,
            execution_mode: phase.execution_mode,
            outcomes,
            skipped_agents,
            elapsed: started.elapsed(),
        };

        tracing::info!(
            phase = %phase.number,
            succeeded = report.succeeded(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Phase finished"
        );
        Ok(report)
    }

    async fn run_sequential(
        &self,
        phase: &ExecutionPhase,
        metadata: &MetadataIndex<'_>,
        abort_on_failure: bool,
    ) -> (Vec<AgentOutcome>, Vec<String>) {
        let mut outcomes: Vec<AgentOutcome> = Vec::with_capacity(phase.len());
        let mut skipped = Vec::new();

        for agent in &phase.agents {
            if !skipped.is_empty() || (abort_on_failure && outcomes.iter().any(failed)) {
                skipped.push(agent.clone());
                continue;
            }

            let invocation =
                self.invocation(agent, phase.number, metadata, CancellationSignal::never());
            let outcome =
                run_agent(Arc::clone(&self.runner), invocation, self.config.agent_timeout).await;
            log_outcome(phase.number, &outcome);
            outcomes.push(outcome);
        }

        (outcomes, skipped)
    }

    async fn run_parallel(
        &self,
        phase: &ExecutionPhase,
        metadata: &MetadataIndex<'_>,
        abort_on_failure: bool,
    ) -> CadenceResult<(Vec<AgentOutcome>, Vec<String>)> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_agents));
        let source = CancellationSource::new();
        let mut tasks = JoinSet::new();

        for agent in &phase.agents {
            let runner = Arc::clone(&self.runner);
            let semaphore = Arc::clone(&semaphore);
            let invocation = self.invocation(agent, phase.number, metadata, source.signal());
            let timeout = self.config.agent_timeout;

            tasks.spawn(async move {
                match semaphore.acquire_owned().await {
                    Ok(_permit) => run_agent(runner, invocation, timeout).await,
                    Err(_) => AgentOutcome::failed(invocation.agent, "concurrency limiter closed"),
                }
            });
        }

        let mut outcomes: Vec<AgentOutcome> = Vec::with_capacity(phase.len());
        let mut panic_reason: Option<String> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    log_outcome(phase.number, &outcome);
                    if !outcome.success && abort_on_failure && !source.is_cancelled() {
                        tracing::warn!(
                            phase = %phase.number,
                            agent = %outcome.agent,
                            "Cancelling sibling agents"
                        );
                        source.cancel();
                        tasks.abort_all();
                    }
                    outcomes.push(outcome);
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    panic_reason.get_or_insert_with(|| e.to_string());
                }
            }
        }

        let position = |agent: &str| phase.agents.iter().position(|a| a == agent);
        outcomes.sort_by_key(|o| position(o.agent.as_str()));
        let unfinished: Vec<String> = phase
            .agents
            .iter()
            .filter(|a| !outcomes.iter().any(|o| &o.agent == *a))
            .cloned()
            .collect();

        if let Some(reason) = panic_reason {
            return Err(ExecutionError::TaskJoin {
                agent: unfinished.join(", "),
                reason,
            }
            .into());
        }

        Ok((outcomes, unfinished))
    }

    fn invocation(
        &self,
        agent: &str,
        phase: PhaseNumber,
        metadata: &MetadataIndex<'_>,
        cancellation: CancellationSignal,
    ) -> AgentInvocation {
        AgentInvocation {
            agent: agent.to_string(),
            phase,
            metadata: metadata.get(agent).map(|m| (*m).clone()).unwrap_or_default(),
            cancellation,
        }
    }
}

fn failed(outcome: &AgentOutcome) -> bool {
    !outcome.success
}

fn log_outcome(phase: PhaseNumber, outcome: &AgentOutcome) {
    if outcome.success {
        tracing::debug!(
            phase = %phase,
            agent = %outcome.agent,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "Agent succeeded"
        );
    } else {
        tracing::warn!(
            phase = %phase,
            agent = %outcome.agent,
            error = outcome.error.as_deref().unwrap_or("unknown"),
            "Agent failed"
        );
    }
}

/// Run one agent under the configured time limit. The executor measures
/// elapsed time itself.
async fn run_agent(
    runner: Arc<dyn AgentRunner>,
    invocation: AgentInvocation,
    timeout: Duration,
) -> AgentOutcome {
    let agent = invocation.agent.clone();
    let started = Instant::now();

    match tokio::time::timeout(timeout, runner.run(invocation)).await {
        Ok(outcome) => outcome.with_elapsed(started.elapsed()),
        Err(_) => AgentOutcome::failed(
            agent,
            format!("timed out after {:.1}s", timeout.as_secs_f64()),
        )
        .with_elapsed(timeout),
    }
}
