//! Workflow execution state
//!
//! A [`WorkflowExecution`] is live only while its workflow runs. It is held
//! in an [`ExecutionStore`] keyed by execution id and removed again on every
//! exit path through [`ActiveExecution`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use scholar_agent::{JsonMap, ProviderType};

/// Status of a single workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed,
    Skipped,
}

/// Result of executing (or skipping) a workflow step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(default)]
    pub output: JsonMap,
    #[serde(default)]
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub provider_type: ProviderType,
}

impl StepResult {
    pub fn completed(step_id: impl Into<String>, provider_type: ProviderType, output: JsonMap, elapsed_ms: u64) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Completed,
            output,
            error: None,
            execution_time_ms: elapsed_ms,
            provider_type,
        }
    }

    pub fn failed(
        step_id: impl Into<String>,
        provider_type: ProviderType,
        error: impl Into<String>,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Failed,
            output: JsonMap::new(),
            error: Some(error.into()),
            execution_time_ms: elapsed_ms,
            provider_type,
        }
    }

    pub fn skipped(step_id: impl Into<String>, provider_type: ProviderType) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Skipped,
            output: JsonMap::new(),
            error: None,
            execution_time_ms: 0,
            provider_type,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }

    /// Completed or skipped steps satisfy their dependents
    pub fn satisfies_dependents(&self) -> bool {
        matches!(self.status, StepStatus::Completed | StepStatus::Skipped)
    }
}

/// Step results in the order they were first recorded
pub type StepResults = IndexMap<String, StepResult>;

/// Status of a workflow execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
}

/// State of one run of a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: String,
    pub workflow_id: String,
    pub session_id: String,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub step_results: StepResults,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl WorkflowExecution {
    /// Start a new running execution with a fresh id
    pub fn start(workflow_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            session_id: session_id.into(),
            status: WorkflowStatus::Running,
            current_step: None,
            step_results: IndexMap::new(),
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    /// Record a step result. Re-recording an id overwrites it in place.
    pub fn record(&mut self, result: StepResult) {
        self.step_results.insert(result.step_id.clone(), result);
    }

    /// Record a result under an explicit step id
    pub fn record_as(&mut self, step_id: &str, result: StepResult) {
        self.step_results.insert(step_id.to_string(), result);
    }

    pub fn complete(&mut self) {
        self.status = WorkflowStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = WorkflowStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }
}

/// Storage for in-flight executions
pub trait ExecutionStore: Send + Sync {
    /// Insert or replace the snapshot for an execution
    fn put(&self, execution: &WorkflowExecution);

    fn get(&self, execution_id: &str) -> Option<WorkflowExecution>;

    fn remove(&self, execution_id: &str) -> Option<WorkflowExecution>;

    /// Ids of all stored executions
    fn active_ids(&self) -> Vec<String>;
}

/// Process-local execution store
#[derive(Debug, Default)]
pub struct InMemoryExecutionStore {
    executions: RwLock<HashMap<String, WorkflowExecution>>,
}

impl InMemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExecutionStore for InMemoryExecutionStore {
    fn put(&self, execution: &WorkflowExecution) {
        let mut executions = self.executions.write().unwrap_or_else(|e| e.into_inner());
        executions.insert(execution.id.clone(), execution.clone());
    }

    fn get(&self, execution_id: &str) -> Option<WorkflowExecution> {
        let executions = self.executions.read().unwrap_or_else(|e| e.into_inner());
        executions.get(execution_id).cloned()
    }

    fn remove(&self, execution_id: &str) -> Option<WorkflowExecution> {
        let mut executions = self.executions.write().unwrap_or_else(|e| e.into_inner());
        executions.remove(execution_id)
    }

    fn active_ids(&self) -> Vec<String> {
        let executions = self.executions.read().unwrap_or_else(|e| e.into_inner());
        executions.keys().cloned().collect()
    }
}

/// Registration of a running execution. Dropping it removes the
/// execution from the store, including on panic or cancellation.
pub struct ActiveExecution {
    store: Arc<dyn ExecutionStore>,
    execution: WorkflowExecution,
}

impl ActiveExecution {
    pub fn register(store: Arc<dyn ExecutionStore>, execution: WorkflowExecution) -> Self {
        store.put(&execution);
        Self { store, execution }
    }

    pub fn execution(&self) -> &WorkflowExecution {
        &self.execution
    }

    /// Mutate the execution and publish the new snapshot
    pub fn update<F>(&mut self, f: F)
    where
        F: FnOnce(&mut WorkflowExecution),
    {
        f(&mut self.execution);
        self.store.put(&self.execution);
    }

    /// Final state of the execution; the store entry is removed
    pub fn finish(self) -> WorkflowExecution {
        self.execution.clone()
    }
}

impl Drop for ActiveExecution {
    fn drop(&mut self) {
        self.store.remove(&self.execution.id);
    }
}
