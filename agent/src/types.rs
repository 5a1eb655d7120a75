//! Shared data model for capability providers
//!
//! These are the values exchanged between the orchestrator and the
//! providers it drives: the per-request execution context, plans,
//! execution results and handoff directives.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON object used for free-form inputs and outputs
pub type JsonMap = Map<String, Value>;

// ============================================================================
// Provider identity
// ============================================================================

/// The kind of capability provider. Used as the unique registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Task,
    Project,
    Grant,
    Research,
    Calendar,
    Writing,
    Personnel,
    Planner,
}

impl ProviderType {
    /// All provider types, in default registration order
    pub const ALL: [ProviderType; 8] = [
        ProviderType::Task,
        ProviderType::Project,
        ProviderType::Grant,
        ProviderType::Research,
        ProviderType::Calendar,
        ProviderType::Writing,
        ProviderType::Personnel,
        ProviderType::Planner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Task => "task",
            ProviderType::Project => "project",
            ProviderType::Grant => "grant",
            ProviderType::Research => "research",
            ProviderType::Calendar => "calendar",
            ProviderType::Writing => "writing",
            ProviderType::Personnel => "personnel",
            ProviderType::Planner => "planner",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known provider type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown provider type: {0}")]
pub struct ParseProviderTypeError(pub String);

impl FromStr for ProviderType {
    type Err = ParseProviderTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        ProviderType::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| ParseProviderTypeError(s.to_string()))
    }
}

/// Lifecycle status reported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Idle,
    Planning,
    Executing,
    AwaitingFeedback,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Idle => "idle",
            ExecutionStatus::Planning => "planning",
            ExecutionStatus::Executing => "executing",
            ExecutionStatus::AwaitingFeedback => "awaiting_feedback",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }
}

// ============================================================================
// Execution context
// ============================================================================

/// Role of a message in the conversation history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationRole {
    User,
    Assistant,
    System,
    Tool,
}

/// A message in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub session_id: String,
    pub role: ConversationRole,
    #[serde(default)]
    pub provider_type: Option<ProviderType>,
    pub content: String,
    #[serde(default)]
    pub metadata: JsonMap,
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(session_id: impl Into<String>, role: ConversationRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            role,
            provider_type: None,
            content: content.into(),
            metadata: JsonMap::new(),
            created_at: Utc::now(),
        }
    }
}

/// Short-term scratchpad carried with a request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkingMemory {
    #[serde(default)]
    pub mentioned_tasks: Vec<String>,
    #[serde(default)]
    pub mentioned_projects: Vec<String>,
    #[serde(default)]
    pub mentioned_people: Vec<String>,
    #[serde(default)]
    pub mentioned_dates: Vec<String>,
    #[serde(default)]
    pub current_goal: Option<String>,
    #[serde(default)]
    pub user_intent: Option<String>,
    #[serde(default)]
    pub relevant_documents: Vec<String>,
    #[serde(default)]
    pub intermediate_results: JsonMap,
}

/// Per-request context handed to providers by reference.
///
/// The orchestrator only reads it; providers may inspect the snapshots
/// of user data to build their prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub session_id: String,
    pub workspace_id: String,
    pub user_id: String,

    #[serde(default)]
    pub active_provider: Option<ProviderType>,
    #[serde(default)]
    pub active_task_id: Option<String>,
    #[serde(default)]
    pub active_project_id: Option<String>,

    /// Conversation history
    #[serde(default)]
    pub history: Vec<ConversationMessage>,

    #[serde(default)]
    pub working_memory: WorkingMemory,

    /// User data snapshots
    #[serde(default)]
    pub user_tasks: Vec<JsonMap>,
    #[serde(default)]
    pub user_projects: Vec<JsonMap>,
    #[serde(default)]
    pub user_profile: JsonMap,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new("default", "default", "anonymous")
    }
}

impl ExecutionContext {
    pub fn new(
        session_id: impl Into<String>,
        workspace_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            workspace_id: workspace_id.into(),
            user_id: user_id.into(),
            active_provider: None,
            active_task_id: None,
            active_project_id: None,
            history: Vec::new(),
            working_memory: WorkingMemory::default(),
            user_tasks: Vec::new(),
            user_projects: Vec::new(),
            user_profile: JsonMap::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<ConversationMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_current_goal(mut self, goal: impl Into<String>) -> Self {
        self.working_memory.current_goal = Some(goal.into());
        self
    }

    pub fn with_user_tasks(mut self, tasks: Vec<JsonMap>) -> Self {
        self.user_tasks = tasks;
        self
    }

    pub fn with_user_projects(mut self, projects: Vec<JsonMap>) -> Self {
        self.user_projects = projects;
        self
    }

    pub fn with_user_profile(mut self, profile: JsonMap) -> Self {
        self.user_profile = profile;
        self
    }
}

// ============================================================================
// Plans and results
// ============================================================================

/// Advisory plan produced by a provider before execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: String,
    pub provider_type: ProviderType,
    pub goal: String,
    pub steps: Vec<String>,
    #[serde(default)]
    pub required_tools: Vec<String>,
    /// 1-5 scale
    pub estimated_complexity: u8,
    #[serde(default)]
    pub requires_confirmation: bool,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(provider_type: ProviderType, goal: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            plan_id: uuid::Uuid::new_v4().to_string(),
            provider_type,
            goal: goal.into(),
            steps,
            required_tools: Vec::new(),
            estimated_complexity: 1,
            requires_confirmation: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_required_tools(mut self, tools: Vec<String>) -> Self {
        self.required_tools = tools;
        self
    }

    /// Set the complexity estimate, clamped to 1..=5
    pub fn with_complexity(mut self, complexity: usize) -> Self {
        self.estimated_complexity = complexity.clamp(1, 5) as u8;
        self
    }

    pub fn with_confirmation(mut self, requires: bool) -> Self {
        self.requires_confirmation = requires;
        self
    }
}

/// A tool invocation requested by a provider's backend output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: JsonMap,
}

/// A follow-up action suggested to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub label: String,
    pub action: String,
    #[serde(default)]
    pub params: JsonMap,
}

impl SuggestedAction {
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
            params: JsonMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// One-shot transfer of control from one provider to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handoff {
    pub from: ProviderType,
    pub to: ProviderType,
    pub reason: String,
    #[serde(default)]
    pub context: JsonMap,
    #[serde(default = "default_preserve_history")]
    pub preserve_history: bool,
}

fn default_preserve_history() -> bool {
    true
}

impl Handoff {
    pub fn new(from: ProviderType, to: ProviderType, reason: impl Into<String>) -> Self {
        Self {
            from,
            to,
            reason: reason.into(),
            context: JsonMap::new(),
            preserve_history: true,
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Terminal value returned by `Provider::execute`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub result_id: String,
    pub provider_type: ProviderType,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub output: JsonMap,
    #[serde(default)]
    pub tool_calls: Vec<ToolInvocation>,
    #[serde(default)]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(default)]
    pub handoff: Option<Handoff>,
    #[serde(default)]
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub tokens_used: u64,
    pub created_at: DateTime<Utc>,
}

impl ExecutionResult {
    fn with_status(provider_type: ProviderType, status: ExecutionStatus, output: JsonMap) -> Self {
        Self {
            result_id: uuid::Uuid::new_v4().to_string(),
            provider_type,
            status,
            output,
            tool_calls: Vec::new(),
            suggested_actions: Vec::new(),
            handoff: None,
            error: None,
            execution_time_ms: 0,
            tokens_used: 0,
            created_at: Utc::now(),
        }
    }

    /// A completed result with the given output
    pub fn completed(provider_type: ProviderType, output: JsonMap) -> Self {
        Self::with_status(provider_type, ExecutionStatus::Completed, output)
    }

    /// A failed result carrying the error text
    pub fn failed(provider_type: ProviderType, error: impl Into<String>) -> Self {
        let mut result = Self::with_status(provider_type, ExecutionStatus::Failed, JsonMap::new());
        result.error = Some(error.into());
        result
    }

    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.output.insert(key.into(), value.into());
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolInvocation>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_suggested_actions(mut self, actions: Vec<SuggestedAction>) -> Self {
        self.suggested_actions = actions;
        self
    }

    pub fn with_handoff(mut self, handoff: Handoff) -> Self {
        self.handoff = Some(handoff);
        self
    }

    pub fn with_timing(mut self, execution_time_ms: u64, tokens_used: u64) -> Self {
        self.execution_time_ms = execution_time_ms;
        self.tokens_used = tokens_used;
        self
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// A named capability a provider offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub description: String,
}

impl Capability {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A tool a provider may invoke
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Immutable description of a registered provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub provider_type: ProviderType,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
    /// Lowercase keywords used by the default routing score
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ProviderDescriptor {
    pub fn new(provider_type: ProviderType, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            provider_type,
            name: name.into(),
            description: description.into(),
            capabilities: Vec::new(),
            tools: Vec::new(),
            keywords: Vec::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(|k| k.into().to_lowercase()).collect();
        self
    }

    /// Summary suitable for listing providers to a client
    pub fn info(&self) -> ProviderInfo {
        ProviderInfo {
            provider_type: self.provider_type,
            name: self.name.clone(),
            description: self.description.clone(),
            capabilities: self.capabilities.iter().map(|c| c.name.clone()).collect(),
            tools: self.tools.iter().map(|t| t.name.clone()).collect(),
        }
    }
}

/// Listing entry returned by `get_provider_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub tools: Vec<String>,
}
