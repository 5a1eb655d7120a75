//! Orchestrator facade
//!
//! Ties the registry, workflow engine, task supervisor and message queue
//! together behind the transport-agnostic surface: chat turns, single
//! tasks, workflow runs, status queries and inter-provider messages.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use scholar_agent::types::{SuggestedAction, ToolInvocation};
use scholar_agent::{ExecutionContext, ExecutionResult, JsonMap, Provider, ProviderInfo, ProviderType};

use crate::engine::{OrchestrateResponse, WorkflowEngine};
use crate::error::{panic_message, OrchestratorError, Result};
use crate::execution::{ExecutionStore, WorkflowExecution};
use crate::messaging::{InterAgentMessage, MessageQueue, Recipient};
use crate::registry::Registry;
use crate::tasks::{TaskSnapshot, TaskState, TaskSupervisor};
use crate::workflow::WorkflowDefinition;

/// One chat turn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub context: JsonMap,
    /// Explicit provider override, bypassing routing
    #[serde(default, alias = "agent_type")]
    pub provider_type: Option<String>,
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_type = Some(provider_type.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub message_id: String,
    pub content: String,
    pub provider_type: ProviderType,
    #[serde(default)]
    pub tool_calls: Vec<ToolInvocation>,
    #[serde(default)]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(default)]
    pub metadata: JsonMap,
}

/// A single provider task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteTaskRequest {
    #[serde(alias = "agent_type")]
    pub provider_type: String,
    pub task_type: String,
    #[serde(default)]
    pub input: JsonMap,
    /// Return immediately and run the task in the background
    #[serde(default)]
    pub async_execution: bool,
}

impl ExecuteTaskRequest {
    pub fn new(provider_type: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            provider_type: provider_type.into(),
            task_type: task_type.into(),
            input: JsonMap::new(),
            async_execution: false,
        }
    }

    pub fn with_input(mut self, input: JsonMap) -> Self {
        self.input = input;
        self
    }

    pub fn detached(mut self) -> Self {
        self.async_execution = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteTaskResponse {
    pub task_id: String,
    pub status: TaskState,
    #[serde(default)]
    pub result: Option<JsonMap>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExecuteTaskResponse {
    fn failed(task_id: String, error: impl Into<String>) -> Self {
        Self {
            task_id,
            status: TaskState::Failed,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Entry point for routing, tasks and workflows
pub struct Orchestrator {
    registry: Arc<Registry>,
    engine: WorkflowEngine,
    tasks: TaskSupervisor,
    messages: MessageQueue,
    default_provider: ProviderType,
}

impl Orchestrator {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            engine: WorkflowEngine::new(registry.clone()),
            registry,
            tasks: TaskSupervisor::new(),
            messages: MessageQueue::new(),
            default_provider: ProviderType::Planner,
        }
    }

    /// Provider used when routing finds no match
    pub fn with_default_provider(mut self, provider_type: ProviderType) -> Self {
        self.default_provider = provider_type;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.engine = self.engine.with_default_step_timeout(timeout);
        self
    }

    /// How long finished detached tasks stay retrievable
    pub fn with_task_retention(mut self, retention: Duration) -> Self {
        self.tasks = self.tasks.with_retention(retention);
        self
    }

    pub fn with_execution_store(mut self, store: Arc<dyn ExecutionStore>) -> Self {
        self.engine = self.engine.with_store(store);
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // ------------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------------

    /// Handle one chat turn.
    ///
    /// Errors only when no provider can be resolved. Execution failures and
    /// panics come back as ordinary responses describing the error.
    pub async fn chat(&self, request: &ChatRequest, context: &ExecutionContext) -> Result<ChatResponse> {
        let (mut provider, routing_confidence) = self.resolve_provider(request, context).await?;

        if let Some(handoff) = provider.should_handoff(&request.message, context) {
            match self.registry.get(handoff.to) {
                Some(target) => {
                    tracing::info!("Handing off from {} to {}: {}", handoff.from, handoff.to, handoff.reason);
                    provider = target;
                }
                None => tracing::warn!("Handoff target {} not registered, keeping {}", handoff.to, handoff.from),
            }
        }

        let provider_type = provider.provider_type();
        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(|| context.session_id.clone());

        let outcome = AssertUnwindSafe(provider.execute(&request.message, context, None))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let error = panic_message(payload.as_ref());
                tracing::error!("Agent {} failed during chat: {}", provider_type, error);
                return Ok(error_response(session_id, provider_type, &error));
            }
        };

        let mut metadata = JsonMap::new();
        metadata.insert("execution_time_ms".into(), result.execution_time_ms.into());
        metadata.insert("tokens_used".into(), result.tokens_used.into());
        metadata.insert("status".into(), result.status.as_str().into());
        if let Some(confidence) = routing_confidence {
            metadata.insert("routing_confidence".into(), json!(confidence));
        }
        if let Some(error) = &result.error {
            metadata.insert("error".into(), error.clone().into());
        }
        // Surfaced for the caller, never followed here
        if let Some(handoff) = &result.handoff {
            metadata.insert(
                "handoff".into(),
                json!({"to_provider": handoff.to, "reason": handoff.reason}),
            );
        }

        Ok(ChatResponse {
            session_id,
            content: response_content(&result),
            message_id: result.result_id,
            provider_type,
            tool_calls: result.tool_calls,
            suggested_actions: result.suggested_actions,
            metadata,
        })
    }

    /// Explicit override, then routing, then the default provider.
    /// Returns the routing confidence only when routing chose the provider.
    async fn resolve_provider(
        &self,
        request: &ChatRequest,
        context: &ExecutionContext,
    ) -> Result<(Arc<dyn Provider>, Option<f32>)> {
        if let Some(name) = &request.provider_type {
            let provider = name
                .parse::<ProviderType>()
                .ok()
                .and_then(|t| self.registry.get(t))
                .ok_or_else(|| OrchestratorError::UnknownProviderType(name.clone()))?;
            return Ok((provider, None));
        }

        let (routed, confidence) = self.registry.route(&request.message, context, &[]).await;
        if let Some(provider) = routed {
            return Ok((provider, Some(confidence)));
        }

        tracing::info!("No agent claimed the request, using {}", self.default_provider);
        self.registry
            .get(self.default_provider)
            .map(|provider| (provider, None))
            .ok_or(OrchestratorError::NoProvidersAvailable)
    }

    // ------------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------------

    /// Run one task on a named provider, inline or detached
    pub async fn execute_task(&self, request: &ExecuteTaskRequest, context: &ExecutionContext) -> ExecuteTaskResponse {
        let task_id = uuid::Uuid::new_v4().to_string();

        let Some(provider) = request
            .provider_type
            .parse::<ProviderType>()
            .ok()
            .and_then(|t| self.registry.get(t))
        else {
            let error = OrchestratorError::UnknownProviderType(request.provider_type.clone());
            return ExecuteTaskResponse::failed(task_id, error.to_string());
        };

        let prompt = task_prompt(&request.task_type, &request.input);

        if request.async_execution {
            let context = context.clone();
            let provider_type = provider.provider_type();
            self.tasks.spawn(&task_id, provider_type, &request.task_type, async move {
                provider.execute(&prompt, &context, None).await
            });
            tracing::info!("Started async task {} on {}", task_id, provider_type);
            return ExecuteTaskResponse {
                task_id,
                status: TaskState::Running,
                result: None,
                error: None,
            };
        }

        match AssertUnwindSafe(provider.execute(&prompt, context, None))
            .catch_unwind()
            .await
        {
            Ok(result) => ExecuteTaskResponse {
                task_id,
                status: if result.is_completed() {
                    TaskState::Completed
                } else {
                    TaskState::Failed
                },
                result: Some(result.output),
                error: result.error,
            },
            Err(payload) => ExecuteTaskResponse::failed(task_id, panic_message(payload.as_ref())),
        }
    }

    /// Snapshot of a detached task
    pub fn task_status(&self, task_id: &str) -> Option<TaskSnapshot> {
        self.tasks.status(task_id)
    }

    pub fn cancel_task(&self, task_id: &str) -> bool {
        self.tasks.cancel(task_id)
    }

    /// Drop every finished detached task, returning how many were dropped
    pub fn prune_tasks(&self) -> usize {
        self.tasks.prune_finished()
    }

    /// Number of detached tasks still tracked
    pub fn tracked_tasks(&self) -> usize {
        self.tasks.len()
    }

    // ------------------------------------------------------------------------
    // Workflows
    // ------------------------------------------------------------------------

    pub async fn orchestrate(
        &self,
        workflow: &WorkflowDefinition,
        input: &JsonMap,
        context: &ExecutionContext,
    ) -> OrchestrateResponse {
        self.engine.run(workflow, input, context).await
    }

    /// Snapshot of an execution that is still running
    pub fn get_workflow_status(&self, execution_id: &str) -> Option<WorkflowExecution> {
        self.engine.status(execution_id)
    }

    pub fn get_provider_info(&self) -> Vec<ProviderInfo> {
        self.registry.info()
    }

    // ------------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------------

    /// Queue a message for later processing
    pub fn send_message(&self, message: InterAgentMessage) {
        match message.recipient {
            Recipient::All => {
                for provider in self.registry.iter() {
                    tracing::debug!("Broadcast {} queued for {}", message.id, provider.provider_type());
                }
            }
            Recipient::Provider(provider_type) if !self.registry.contains(provider_type) => {
                tracing::warn!("Message {} addressed to unregistered agent {}", message.id, provider_type);
            }
            Recipient::Provider(_) | Recipient::Orchestrator => {}
        }
        self.messages.push(message);
    }

    /// Drain the queue in FIFO order, returning how many messages were processed
    pub fn process_messages(&self) -> usize {
        let drained = self.messages.drain();
        for message in &drained {
            tracing::debug!("Processing message from {} to {}", message.sender, message.recipient);
        }
        drained.len()
    }

    pub fn pending_messages(&self) -> usize {
        self.messages.len()
    }
}

fn task_prompt(task_type: &str, input: &JsonMap) -> String {
    format!("Execute {}: {}", task_type, Value::Object(input.clone()))
}

/// `output.response` when it is a string, otherwise the error or the output JSON
fn response_content(result: &ExecutionResult) -> String {
    match result.output.get("response") {
        Some(Value::String(text)) => text.clone(),
        _ => match &result.error {
            Some(error) if result.output.is_empty() => error_content(error),
            _ => Value::Object(result.output.clone()).to_string(),
        },
    }
}

fn error_content(error: &str) -> String {
    format!("I encountered an error processing your request: {}", error)
}

fn error_response(session_id: String, provider_type: ProviderType, error: &str) -> ChatResponse {
    let mut metadata = JsonMap::new();
    metadata.insert("error".into(), error.into());
    metadata.insert("status".into(), "failed".into());

    ChatResponse {
        session_id,
        message_id: uuid::Uuid::new_v4().to_string(),
        content: error_content(error),
        provider_type,
        tool_calls: Vec::new(),
        suggested_actions: Vec::new(),
        metadata,
    }
}
