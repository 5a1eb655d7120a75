//! Workflow definitions
//!
//! A workflow is a named DAG of steps. Each step is bound to a provider
//! and an action, and may depend on other steps, carry a condition, and
//! declare its own timeout, retry count and error policy.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use scholar_agent::{JsonMap, ProviderType};

use crate::error::{OrchestratorError, Result};
use crate::execution::StepResults;

/// Upper bound on `retries` for a single step
pub const MAX_STEP_RETRIES: u32 = 10;

/// Workflow-wide error handling mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorHandling {
    /// Unsatisfied dependencies abort the workflow
    #[default]
    FailFast,
    Continue,
    Retry,
    Fallback,
}

/// What to do when a step fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the whole workflow
    #[default]
    Fail,
    /// Keep the failed result and move on
    Skip,
    /// Run the step once more on the fallback provider
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Always,
    If,
    Unless,
}

/// Guard evaluated before a step runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowCondition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl WorkflowCondition {
    pub fn always() -> Self {
        Self {
            kind: ConditionKind::Always,
            expression: None,
            value: None,
        }
    }

    /// Run only if the referenced step completed, e.g. `steps.extract`
    pub fn if_completed(expression: impl Into<String>) -> Self {
        Self {
            kind: ConditionKind::If,
            expression: Some(expression.into()),
            value: None,
        }
    }

    /// Run only if the referenced step did not complete
    pub fn unless_completed(expression: impl Into<String>) -> Self {
        Self {
            kind: ConditionKind::Unless,
            expression: Some(expression.into()),
            value: None,
        }
    }

    /// Step id named by a `steps.<id>...` expression
    pub fn referenced_step(&self) -> Option<&str> {
        let rest = self.expression.as_deref()?.strip_prefix("steps.")?;
        Some(rest.split('.').next().unwrap_or(rest))
    }

    /// Whether the guarded step should run.
    ///
    /// Only `steps.<id>` expressions over an already-recorded step can
    /// block a step; every other form proceeds.
    pub fn evaluate(&self, results: &StepResults) -> bool {
        if self.kind == ConditionKind::Always {
            return true;
        }
        let Some(recorded) = self.referenced_step().and_then(|id| results.get(id)) else {
            return true;
        };
        match self.kind {
            ConditionKind::If => recorded.is_completed(),
            ConditionKind::Unless => !recorded.is_completed(),
            ConditionKind::Always => true,
        }
    }
}

/// A single step in a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique within the workflow
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Provider that executes the step
    #[serde(alias = "agent")]
    pub provider: ProviderType,

    pub action: String,

    /// Input values; string leaves may contain `{{...}}` references
    #[serde(default)]
    pub input: JsonMap,

    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default)]
    pub condition: Option<WorkflowCondition>,

    /// Per-attempt timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub retries: u32,

    #[serde(default)]
    pub on_error: ErrorPolicy,

    #[serde(default, alias = "fallback_agent")]
    pub fallback_provider: Option<ProviderType>,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>, provider: ProviderType, action: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            provider,
            action: action.into(),
            input: JsonMap::new(),
            depends_on: Vec::new(),
            condition: None,
            timeout: None,
            retries: 0,
            on_error: ErrorPolicy::default(),
            fallback_provider: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input.insert(key.into(), value.into());
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_condition(mut self, condition: WorkflowCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_on_error(mut self, policy: ErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    /// Fail over to another provider when this step fails
    pub fn with_fallback(mut self, provider: ProviderType) -> Self {
        self.on_error = ErrorPolicy::Fallback;
        self.fallback_provider = Some(provider);
        self
    }

    /// Single-attempt copy of this step bound to the fallback provider
    pub fn fallback_step(&self, provider: ProviderType) -> WorkflowStep {
        WorkflowStep {
            id: format!("{}_fallback", self.id),
            name: format!("{} (fallback)", self.name),
            provider,
            action: self.action.clone(),
            input: self.input.clone(),
            depends_on: Vec::new(),
            condition: None,
            timeout: self.timeout,
            retries: 0,
            on_error: ErrorPolicy::Skip,
            fallback_provider: None,
        }
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

/// A complete workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_version")]
    pub version: String,

    pub steps: Vec<WorkflowStep>,

    #[serde(default)]
    pub error_handling: ErrorHandling,

    /// Whole-workflow timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            version: default_version(),
            steps: Vec::new(),
            error_handling: ErrorHandling::default(),
            timeout: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_error_handling(mut self, mode: ErrorHandling) -> Self {
        self.error_handling = mode;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    pub fn step(&self, id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let workflow: Self = toml::from_str(toml_str).map_err(|e| OrchestratorError::Parse(e.to_string()))?;
        workflow.check_limits()
    }

    pub fn from_json(json_str: &str) -> Result<Self> {
        let workflow: Self = serde_json::from_str(json_str).map_err(|e| OrchestratorError::Parse(e.to_string()))?;
        workflow.check_limits()
    }

    fn check_limits(self) -> Result<Self> {
        if let Some(step) = self.steps.iter().find(|s| s.retries > MAX_STEP_RETRIES) {
            return Err(OrchestratorError::Parse(format!(
                "Step {} sets retries = {}, the maximum is {}",
                step.id, step.retries, MAX_STEP_RETRIES
            )));
        }
        Ok(self)
    }

    /// Load from a `.toml` or `.json` file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| OrchestratorError::Io(e.to_string()))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            other => Err(OrchestratorError::Parse(format!(
                "Unsupported workflow file extension: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}

/// Collection of built-in workflows
pub fn builtin_workflows() -> HashMap<String, WorkflowDefinition> {
    let mut workflows = HashMap::new();

    workflows.insert(
        "email-to-tasks".to_string(),
        WorkflowDefinition::new("email-to-tasks", "Email to Tasks")
            .with_description("Extract tasks from an email and prioritize them")
            .with_step(
                WorkflowStep::new("extract", ProviderType::Task, "extract_tasks")
                    .with_name("Extract Tasks")
                    .with_input("text", "{{input.email_content}}"),
            )
            .with_step(
                WorkflowStep::new("prioritize", ProviderType::Task, "prioritize_tasks")
                    .with_name("Prioritize Tasks")
                    .with_input("tasks", "{{steps.extract.output.tasks}}")
                    .depends_on(["extract"]),
            ),
    );

    workflows.insert(
        "weekly-update".to_string(),
        WorkflowDefinition::new("weekly-update", "Weekly Update")
            .with_description("Summarize projects and tasks into a weekly update")
            .with_step(WorkflowStep::new("projects", ProviderType::Project, "summarize_all").with_name("Summarize Projects"))
            .with_step(WorkflowStep::new("tasks", ProviderType::Task, "weekly_review").with_name("Review Tasks"))
            .with_step(
                WorkflowStep::new("compile", ProviderType::Writing, "compile_update")
                    .with_name("Compile Update")
                    .with_input("projects", "{{steps.projects.output}}")
                    .with_input("tasks", "{{steps.tasks.output}}")
                    .depends_on(["projects", "tasks"]),
            ),
    );

    workflows
}

/// Load custom workflows (`.toml` and `.json`) from a directory.
///
/// Files that fail to parse are logged and skipped.
pub fn load_custom_workflows(dir: &Path) -> Result<HashMap<String, WorkflowDefinition>> {
    let mut workflows = HashMap::new();

    if !dir.exists() {
        return Ok(workflows);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| OrchestratorError::Io(e.to_string()))?;

    for entry in entries.flatten() {
        let path = entry.path();
        let supported = path
            .extension()
            .is_some_and(|ext| ext == "toml" || ext == "json");
        if !supported {
            continue;
        }
        match WorkflowDefinition::from_file(&path) {
            Ok(workflow) => {
                tracing::debug!("Loaded workflow {} from {:?}", workflow.id, path);
                workflows.insert(workflow.id.clone(), workflow);
            }
            Err(e) => {
                tracing::warn!("Failed to load workflow from {:?}: {}", path, e);
            }
        }
    }

    Ok(workflows)
}
