//! Multi-provider orchestration for the scholar agents
//!
//! This crate provides:
//! - A provider registry with confidence-based routing
//! - Chat and single-task execution, including supervised detached tasks
//! - A workflow engine for DAGs of provider steps (conditions, templates,
//!   retries, timeouts, fallbacks)
//! - Built-in workflows and custom TOML/JSON workflow support
//! - An inter-provider message queue
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use orchestrator::{Orchestrator, Registry, builtin_workflows};
//!
//! let registry = Arc::new(Registry::with_defaults(llm));
//! let orchestrator = Orchestrator::new(registry);
//!
//! let workflows = builtin_workflows();
//! let response = orchestrator
//!     .orchestrate(&workflows["email-to-tasks"], &input, &context)
//!     .await;
//! ```

pub mod engine;
pub mod error;
pub mod execution;
pub mod graph;
pub mod messaging;
pub mod orchestrator;
pub mod registry;
pub mod tasks;
pub mod template;
pub mod workflow;

pub use engine::{OrchestrateResponse, WorkflowEngine, DEFAULT_STEP_TIMEOUT};
pub use error::{OrchestratorError, Result};
pub use execution::{
    ExecutionStore, InMemoryExecutionStore, StepResult, StepResults, StepStatus, WorkflowExecution, WorkflowStatus,
};
pub use messaging::{InterAgentMessage, MessageQueue, MessageType, Recipient};
pub use orchestrator::{ChatRequest, ChatResponse, ExecuteTaskRequest, ExecuteTaskResponse, Orchestrator};
pub use registry::Registry;
pub use tasks::{TaskSnapshot, TaskState, TaskSupervisor, DEFAULT_TASK_RETENTION};
pub use workflow::{
    builtin_workflows, load_custom_workflows, ConditionKind, ErrorHandling, ErrorPolicy, WorkflowCondition,
    WorkflowDefinition, WorkflowStep, MAX_STEP_RETRIES,
};

/// Re-export commonly used types from the agent crate
pub use scholar_agent::{ExecutionContext, ExecutionResult, JsonMap, Provider, ProviderType};
