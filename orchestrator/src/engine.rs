//! Workflow execution engine
//!
//! Executes workflow DAGs step by step in topological order with:
//! - Dependency and condition checks
//! - Template resolution against prior step outputs
//! - Per-attempt timeouts and retries
//! - Fallback providers and per-step error policies

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

use scholar_agent::{ExecutionContext, JsonMap};

use crate::error::{panic_message, OrchestratorError, Result};
use crate::execution::{
    ActiveExecution, ExecutionStore, InMemoryExecutionStore, StepResult, StepResults, WorkflowExecution,
    WorkflowStatus,
};
use crate::graph::execution_order;
use crate::registry::Registry;
use crate::template::{CompiledInput, Scope};
use crate::workflow::{ErrorHandling, ErrorPolicy, WorkflowDefinition, WorkflowStep, MAX_STEP_RETRIES};

/// Per-attempt timeout for steps that do not set one
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(300);

/// Outcome of one workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrateResponse {
    pub execution_id: String,
    pub status: WorkflowStatus,
    /// Results recorded so far, in recording order
    pub results: StepResults,
    #[serde(default)]
    pub error: Option<String>,
}

/// Workflow execution engine
pub struct WorkflowEngine {
    registry: Arc<Registry>,
    store: Arc<dyn ExecutionStore>,
    default_step_timeout: Duration,
}

impl WorkflowEngine {
    /// Create an engine with an in-memory execution store
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            store: Arc::new(InMemoryExecutionStore::new()),
            default_step_timeout: DEFAULT_STEP_TIMEOUT,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ExecutionStore>) -> Self {
        self.store = store;
        self
    }

    /// Per-attempt timeout for steps that do not set one. Zero keeps the built-in default.
    pub fn with_default_step_timeout(mut self, timeout: Duration) -> Self {
        self.default_step_timeout = if timeout.is_zero() { DEFAULT_STEP_TIMEOUT } else { timeout };
        self
    }

    pub fn store(&self) -> &Arc<dyn ExecutionStore> {
        &self.store
    }

    /// Snapshot of a running execution
    pub fn status(&self, execution_id: &str) -> Option<WorkflowExecution> {
        self.store.get(execution_id)
    }

    /// Run a workflow to completion.
    ///
    /// Never fails: aborts are reported as `status = failed` with the error
    /// text and whatever step results were recorded before the abort.
    pub async fn run(&self, workflow: &WorkflowDefinition, input: &JsonMap, context: &ExecutionContext) -> OrchestrateResponse {
        let execution = WorkflowExecution::start(&workflow.id, &context.session_id);
        let mut active = ActiveExecution::register(self.store.clone(), execution);
        tracing::info!(
            "Starting workflow {} ({} steps, execution {})",
            workflow.id,
            workflow.steps.len(),
            active.execution().id
        );

        match self.drive(workflow, input, context, &mut active).await {
            Ok(()) => {
                active.update(|e| e.complete());
                tracing::info!("Workflow {} completed", workflow.id);
            }
            Err(e) => {
                tracing::error!("Workflow execution failed: {}: {}", workflow.id, e);
                active.update(|ex| ex.fail(e.to_string()));
            }
        }

        let execution = active.finish();
        OrchestrateResponse {
            execution_id: execution.id,
            status: execution.status,
            results: execution.step_results,
            error: execution.error,
        }
    }

    async fn drive(
        &self,
        workflow: &WorkflowDefinition,
        input: &JsonMap,
        context: &ExecutionContext,
        active: &mut ActiveExecution,
    ) -> Result<()> {
        let order = execution_order(&workflow.steps)?;
        let started = Instant::now();
        let workflow_limit = workflow.timeout.filter(|&secs| secs > 0);

        for index in order {
            let step = &workflow.steps[index];

            if let Some(secs) = workflow_limit {
                if started.elapsed() >= Duration::from_secs(secs) {
                    return Err(OrchestratorError::aborted(OrchestratorError::WorkflowTimeout(secs)));
                }
            }

            active.update(|e| e.current_step = Some(step.id.clone()));

            if !dependencies_satisfied(step, &active.execution().step_results) {
                if workflow.error_handling == ErrorHandling::FailFast {
                    return Err(OrchestratorError::aborted(OrchestratorError::DependencyUnsatisfied(
                        step.id.clone(),
                    )));
                }
                tracing::warn!("Dependencies not met for step {}, not running it", step.id);
                continue;
            }

            if let Some(condition) = &step.condition {
                if !condition.evaluate(&active.execution().step_results) {
                    tracing::info!("Condition not met, skipping step {}", step.id);
                    active.update(|e| e.record(StepResult::skipped(&step.id, step.provider)));
                    continue;
                }
            }

            let result = self
                .execute_step(step, &active.execution().step_results, input, context)
                .await;
            let failure = (!result.is_completed()).then(|| result.error.clone().unwrap_or_default());
            active.update(|e| e.record(result));

            let Some(error) = failure else { continue };
            match (step.on_error, step.fallback_provider) {
                (ErrorPolicy::Fail, _) => {
                    return Err(OrchestratorError::aborted(OrchestratorError::StepExecutionFailed {
                        step: step.id.clone(),
                        error,
                    }));
                }
                (ErrorPolicy::Fallback, Some(fallback_provider)) => {
                    tracing::warn!("Step {} failed ({}), trying fallback {}", step.id, error, fallback_provider);
                    let fallback = step.fallback_step(fallback_provider);
                    let result = self
                        .execute_step(&fallback, &active.execution().step_results, input, context)
                        .await;
                    active.update(|e| e.record_as(&step.id, result));
                }
                _ => {
                    tracing::warn!("Step {} failed, continuing: {}", step.id, error);
                }
            }
        }

        Ok(())
    }

    /// Execute one step with retries. Always yields a completed or failed result.
    async fn execute_step(
        &self,
        step: &WorkflowStep,
        results: &StepResults,
        input: &JsonMap,
        context: &ExecutionContext,
    ) -> StepResult {
        let started = Instant::now();
        let elapsed_ms = |started: Instant| started.elapsed().as_millis() as u64;

        let Some(provider) = self.registry.get(step.provider) else {
            return StepResult::failed(&step.id, step.provider, format!("Unknown agent: {}", step.provider), 0);
        };

        let resolved = CompiledInput::compile(&step.input).resolve(&Scope { input, results });
        let instruction = step_instruction(&step.action, resolved);
        let limit = step
            .timeout
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(self.default_step_timeout);

        // Definitions built in code skip the load-time check
        let attempts = step.retries.min(MAX_STEP_RETRIES) + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let call = AssertUnwindSafe(provider.execute(&instruction, context, None)).catch_unwind();
            match tokio::time::timeout(limit, call).await {
                Ok(Ok(result)) if result.is_completed() => {
                    return StepResult::completed(&step.id, step.provider, result.output, elapsed_ms(started));
                }
                Ok(Ok(result)) => {
                    last_error = result.error.unwrap_or_else(|| "Agent execution failed".to_string());
                }
                Ok(Err(payload)) => {
                    last_error = panic_message(payload.as_ref());
                }
                Err(_) => {
                    last_error = OrchestratorError::StepTimeout.to_string();
                }
            }

            if attempt < attempts {
                tracing::warn!(
                    "Step {} attempt {}/{} failed: {}, retrying",
                    step.id,
                    attempt,
                    attempts,
                    last_error
                );
            }
        }

        StepResult::failed(&step.id, step.provider, last_error, elapsed_ms(started))
    }
}

/// Every dependency must be recorded as completed or skipped
fn dependencies_satisfied(step: &WorkflowStep, results: &StepResults) -> bool {
    step.depends_on
        .iter()
        .all(|dep| results.get(dep).is_some_and(StepResult::satisfies_dependents))
}

/// Instruction text handed to the provider for a step
fn step_instruction(action: &str, resolved_input: JsonMap) -> String {
    format!(
        "Execute action '{}' with parameters: {}",
        action,
        Value::Object(resolved_input)
    )
}
