//! Built-in persona providers
//!
//! Each persona is a keyword-routed, LLM-backed [`Provider`]. The shared
//! behaviour lives in [`PersonaProvider`]; the per-persona tables (keywords,
//! plan rules, handoff rules, prompts) live in [`catalog`].

mod catalog;
pub mod prompts;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::llm::{CompletionRequest, Llm};
use crate::parsers::parse_tool_directives;
use crate::provider::{mentions_any, Provider};
use crate::types::{
    ExecutionContext, ExecutionResult, Handoff, JsonMap, Plan, ProviderDescriptor, ProviderType,
    SuggestedAction,
};

pub use catalog::persona;

/// Number of characters of the request kept in a plan goal
const GOAL_REQUEST_CHARS: usize = 100;

/// Maximum number of user tasks listed verbatim in the task persona prompt
const MAX_LISTED_TASKS: usize = 10;

/// A keyword rule contributing one plan step
#[derive(Debug, Clone)]
pub struct PlanRule {
    pub triggers: &'static [&'static str],
    pub step: &'static str,
    pub tool: Option<&'static str>,
}

/// How a persona estimates plan complexity
#[derive(Debug, Clone, Copy)]
pub enum Complexity {
    /// Number of matched steps plus an offset
    StepsPlus(usize),
    Fixed(usize),
}

/// A keyword rule that hands the request to another provider
#[derive(Debug, Clone)]
pub struct HandoffRule {
    pub triggers: &'static [&'static str],
    pub to: ProviderType,
    pub reason: &'static str,
    /// Extra boolean flag added to the carried context
    pub flag: Option<&'static str>,
}

/// Persona-specific data added to the user prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptContext {
    None,
    UserTasks,
    UserProjects,
    ResearcherProfile,
    Overview,
}

/// Persona-specific follow-up actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suggestions {
    None,
    TaskBoard,
    Projects,
    Grants,
}

/// Static definition of a persona
#[derive(Debug, Clone)]
pub struct Persona {
    pub descriptor: ProviderDescriptor,
    pub system_prompt: &'static str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub goal_prefix: &'static str,
    pub plan_rules: Vec<PlanRule>,
    pub default_step: &'static str,
    pub complexity: Complexity,
    pub handoffs: Vec<HandoffRule>,
    pub prompt_context: PromptContext,
    pub guidance: &'static str,
    pub suggestions: Suggestions,
}

/// LLM-backed provider driven by a [`Persona`] table
pub struct PersonaProvider {
    persona: Persona,
    llm: Arc<dyn Llm>,
}

impl PersonaProvider {
    pub fn new(persona: Persona, llm: Arc<dyn Llm>) -> Self {
        Self { persona, llm }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    fn build_prompt(&self, request: &str, context: &ExecutionContext) -> String {
        let extra = match self.persona.prompt_context {
            PromptContext::None => String::new(),
            PromptContext::UserTasks => task_listing(&context.user_tasks),
            PromptContext::UserProjects => project_listing(context),
            PromptContext::ResearcherProfile => researcher_profile(&context.user_profile),
            PromptContext::Overview => overview(context),
        };

        format!("User Request: {}\n{}\n\n{}", request, extra, self.persona.guidance)
    }

    fn suggested_actions(&self, request: &str, context: &ExecutionContext) -> Vec<SuggestedAction> {
        let request_lower = request.to_lowercase();
        let mut actions = Vec::new();

        match self.persona.suggestions {
            Suggestions::None => {}
            Suggestions::TaskBoard => {
                if request_lower.contains("extract") || request_lower.contains("task") {
                    actions.push(
                        SuggestedAction::new("Add tasks to board", "create_tasks").with_param("source", "extraction"),
                    );
                }
                if request_lower.contains("prioritize") {
                    actions.push(SuggestedAction::new("Apply suggested priorities", "update_priorities"));
                }
                actions.push(SuggestedAction::new("View all tasks", "navigate").with_param("route", "/board"));
            }
            Suggestions::Projects => {
                if let Some(id) = context.active_project_id.as_deref() {
                    actions.push(
                        SuggestedAction::new("View project", "navigate").with_param("route", format!("/projects/{}", id)),
                    );
                    actions.push(SuggestedAction::new("Add milestone", "add_milestone").with_param("project_id", id));
                }
                actions.push(SuggestedAction::new("View all projects", "navigate").with_param("route", "/projects"));
            }
            Suggestions::Grants => {
                if request_lower.contains("fit") || request_lower.contains("opportunity") {
                    actions.push(SuggestedAction::new("Add to watchlist", "add_to_watchlist"));
                }
                actions.push(SuggestedAction::new("View grants", "navigate").with_param("route", "/grants"));
                actions.push(SuggestedAction::new("Create grant project", "create_project").with_param("type", "grant"));
            }
        }

        actions
    }
}

#[async_trait]
impl Provider for PersonaProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.persona.descriptor
    }

    async fn plan(&self, request: &str, _context: &ExecutionContext) -> Plan {
        let request_lower = request.to_lowercase();
        let mut steps = Vec::new();
        let mut tools = Vec::new();

        for rule in &self.persona.plan_rules {
            if mentions_any(&request_lower, rule.triggers) {
                steps.push(rule.step.to_string());
                if let Some(tool) = rule.tool {
                    tools.push(tool.to_string());
                }
            }
        }
        if steps.is_empty() {
            steps.push(self.persona.default_step.to_string());
        }

        let complexity = match self.persona.complexity {
            Complexity::StepsPlus(offset) => steps.len() + offset,
            Complexity::Fixed(n) => n,
        };
        let goal = format!(
            "{}{}",
            self.persona.goal_prefix,
            request.chars().take(GOAL_REQUEST_CHARS).collect::<String>()
        );

        Plan::new(self.provider_type(), goal, steps)
            .with_required_tools(tools)
            .with_complexity(complexity)
    }

    async fn execute(&self, request: &str, context: &ExecutionContext, _plan: Option<&Plan>) -> ExecutionResult {
        let started = Instant::now();
        let completion_request = CompletionRequest::new(self.build_prompt(request, context))
            .with_system(inject_context(self.persona.system_prompt, context))
            .with_temperature(self.persona.temperature)
            .with_max_tokens(self.persona.max_tokens);

        match self.llm.complete(&completion_request).await {
            Ok(completion) => {
                let tool_calls = parse_tool_directives(&completion.text);
                let mut result = ExecutionResult::completed(self.provider_type(), JsonMap::new())
                    .with_output("response", completion.text)
                    .with_tool_calls(tool_calls)
                    .with_suggested_actions(self.suggested_actions(request, context))
                    .with_timing(started.elapsed().as_millis() as u64, completion.tokens_used);
                if self.persona.prompt_context == PromptContext::UserTasks {
                    result = result.with_output("extracted_tasks", serde_json::Value::Array(Vec::new()));
                }
                result
            }
            Err(e) => {
                let error = format!("{:#}", e);
                tracing::warn!("{} backend call failed: {}", self.persona.descriptor.name, error);
                ExecutionResult::failed(self.provider_type(), error.clone())
                    .with_output("response", format!("I encountered an error: {}", error))
                    .with_timing(started.elapsed().as_millis() as u64, 0)
            }
        }
    }

    fn should_handoff(&self, request: &str, _context: &ExecutionContext) -> Option<Handoff> {
        let request_lower = request.to_lowercase();
        let rule = self
            .persona
            .handoffs
            .iter()
            .find(|rule| mentions_any(&request_lower, rule.triggers))?;

        let mut handoff =
            Handoff::new(self.provider_type(), rule.to, rule.reason).with_context("original_request", request);
        if let Some(flag) = rule.flag {
            handoff = handoff.with_context(flag, true);
        }
        Some(handoff)
    }
}

/// Build the eight built-in personas in default registration order
pub fn builtin_personas(llm: Arc<dyn Llm>) -> Vec<Arc<dyn Provider>> {
    ProviderType::ALL
        .into_iter()
        .map(|provider_type| Arc::new(PersonaProvider::new(persona(provider_type), llm.clone())) as Arc<dyn Provider>)
        .collect()
}

/// Append a `## Context` block describing the user to a system prompt
pub fn inject_context(system_prompt: &str, context: &ExecutionContext) -> String {
    let mut lines = Vec::new();

    if !context.user_profile.is_empty() {
        let profile = serde_json::to_string(&context.user_profile).unwrap_or_default();
        lines.push(format!("User Profile: {}", profile));
    }
    if !context.user_tasks.is_empty() {
        lines.push(format!("User has {} tasks", context.user_tasks.len()));
    }
    if !context.user_projects.is_empty() {
        lines.push(format!("User has {} projects", context.user_projects.len()));
    }
    if let Some(goal) = context.working_memory.current_goal.as_deref() {
        lines.push(format!("Current Goal: {}", goal));
    }

    if lines.is_empty() {
        system_prompt.to_string()
    } else {
        format!("{}\n\n## Context\n{}", system_prompt, lines.join("\n"))
    }
}

fn field<'a>(item: &'a JsonMap, key: &str, default: &'a str) -> &'a str {
    item.get(key).and_then(|v| v.as_str()).unwrap_or(default)
}

fn task_listing(tasks: &[JsonMap]) -> String {
    if tasks.is_empty() {
        return String::new();
    }
    let summary = format!("You have {} existing tasks.", tasks.len());
    if tasks.len() > MAX_LISTED_TASKS {
        return format!("\nCurrent Tasks: {}", summary);
    }

    let listing: Vec<String> = tasks
        .iter()
        .map(|t| {
            format!(
                "- {} ({}, {})",
                field(t, "title", "Untitled"),
                field(t, "status", "todo"),
                field(t, "priority", "p3")
            )
        })
        .collect();
    format!("\nCurrent Tasks:\n{}\n{}", summary, listing.join("\n"))
}

fn project_listing(context: &ExecutionContext) -> String {
    if context.user_projects.is_empty() {
        return String::new();
    }
    let active: Vec<&JsonMap> = context
        .user_projects
        .iter()
        .filter(|p| field(p, "status", "") == "active")
        .collect();

    let mut out = format!(
        "\nUser has {} projects ({} active).",
        context.user_projects.len(),
        active.len()
    );
    if active.len() <= 5 {
        for p in &active {
            out.push_str(&format!(
                "\n- {} ({}, {})",
                field(p, "title", "Untitled"),
                field(p, "type", "general"),
                field(p, "stage", "unknown stage")
            ));
        }
    }

    if let Some(id) = context.active_project_id.as_deref() {
        if let Some(p) = context.user_projects.iter().find(|p| field(p, "id", "") == id) {
            out.push_str(&format!(
                "\n\nCurrently discussing: {}\nType: {}\nStage: {}",
                field(p, "title", "Untitled"),
                field(p, "type", "general"),
                field(p, "stage", "unknown stage")
            ));
        }
    }
    out
}

fn researcher_profile(profile: &JsonMap) -> String {
    if profile.is_empty() {
        return String::new();
    }
    let mut out = String::from("\nResearcher Profile:");
    if let Some(keywords) = profile.get("keywords").and_then(|v| v.as_array()) {
        let areas: Vec<&str> = keywords.iter().filter_map(|k| k.as_str()).collect();
        if !areas.is_empty() {
            out.push_str(&format!("\n- Research areas: {}", areas.join(", ")));
        }
    }
    if let Some(institution) = profile.get("institution").and_then(|v| v.as_str()) {
        out.push_str(&format!("\n- Institution: {}", institution));
    }
    if let Some(title) = profile.get("title").and_then(|v| v.as_str()) {
        out.push_str(&format!("\n- Position: {}", title));
    }
    out
}

fn overview(context: &ExecutionContext) -> String {
    let mut out = String::new();
    if !context.user_tasks.is_empty() {
        out.push_str(&format!("\nUser has {} tasks", context.user_tasks.len()));
    }
    if !context.user_projects.is_empty() {
        out.push_str(&format!("\nUser has {} projects", context.user_projects.len()));
    }
    if let Some(goal) = context.working_memory.current_goal.as_deref() {
        out.push_str(&format!("\nCurrent goal: {}", goal));
    }
    out
}
