//! Orchestration error taxonomy

use scholar_agent::ProviderType;

/// Errors raised while resolving providers or running workflows
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Unknown agent type: {0}")]
    UnknownProviderType(String),

    #[error("No agents available")]
    NoProvidersAvailable,

    #[error("No agent registered for type: {0}")]
    ProviderNotRegistered(ProviderType),

    #[error("Circular dependency detected in workflow steps")]
    CircularDependency,

    #[error("Duplicate step id: {0}")]
    DuplicateStepId(String),

    #[error("Step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: String, dependency: String },

    #[error("Dependencies not met for step: {0}")]
    DependencyUnsatisfied(String),

    #[error("Step timed out")]
    StepTimeout,

    #[error("Step failed: {step} - {error}")]
    StepExecutionFailed { step: String, error: String },

    #[error("Workflow timed out after {0}s")]
    WorkflowTimeout(u64),

    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("{0}")]
    WorkflowAborted(Box<OrchestratorError>),
}

impl OrchestratorError {
    /// Wrap an error that escalated to a workflow abort
    pub fn aborted(cause: OrchestratorError) -> Self {
        match cause {
            already @ OrchestratorError::WorkflowAborted(_) => already,
            other => OrchestratorError::WorkflowAborted(Box::new(other)),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("Agent panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("Agent panicked: {}", message)
    } else {
        "Agent panicked".to_string()
    }
}
