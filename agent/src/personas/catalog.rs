//! Persona tables for the eight built-in providers

use super::prompts;
use super::{Complexity, HandoffRule, Persona, PlanRule, PromptContext, Suggestions};
use crate::types::{Capability, ProviderDescriptor, ProviderType, ToolSpec};

fn capabilities(list: &[(&str, &str)]) -> Vec<Capability> {
    list.iter().map(|(name, desc)| Capability::new(*name, *desc)).collect()
}

fn tools(list: &[(&str, &str)]) -> Vec<ToolSpec> {
    list.iter().map(|(name, desc)| ToolSpec::new(*name, *desc)).collect()
}

/// Get the persona definition for a provider type
pub fn persona(provider_type: ProviderType) -> Persona {
    match provider_type {
        ProviderType::Task => task(),
        ProviderType::Project => project(),
        ProviderType::Grant => grant(),
        ProviderType::Research => research(),
        ProviderType::Calendar => calendar(),
        ProviderType::Writing => writing(),
        ProviderType::Personnel => personnel(),
        ProviderType::Planner => planner(),
    }
}

fn task() -> Persona {
    let descriptor = ProviderDescriptor::new(
        ProviderType::Task,
        "Task Assistant",
        "Helps you manage tasks, extract action items, and stay organized",
    )
    .with_capabilities(capabilities(&[
        ("extract_tasks", "Extract actionable tasks from text like meeting notes, emails, or documents"),
        ("prioritize_tasks", "Analyze and prioritize tasks based on urgency, importance, and deadlines"),
        ("breakdown_task", "Break down complex tasks into smaller, manageable subtasks"),
        ("schedule_tasks", "Suggest optimal timing for tasks based on deadlines and workload"),
        ("batch_update", "Update multiple tasks at once (status, priority, category)"),
    ]))
    .with_tools(tools(&[
        ("extract_tasks", "Extract actionable tasks from text like meeting notes, emails, or documents"),
        ("prioritize_tasks", "Analyze tasks and suggest priority ordering based on urgency, importance, and deadlines"),
        ("breakdown_task", "Break down a complex or large task into smaller, actionable subtasks"),
        ("schedule_tasks", "Suggest when to schedule tasks based on deadlines, availability, and workload"),
    ]))
    .with_keywords([
        "task", "todo", "action", "item", "deadline", "prioritize", "priority", "urgent", "important",
        "extract", "meeting notes", "email", "schedule", "when should", "break down", "subtask",
        "organize", "what should i do", "work on", "complete", "finish",
    ]);

    Persona {
        descriptor,
        system_prompt: prompts::TASK_PROMPT,
        temperature: 0.3,
        max_tokens: 3000,
        goal_prefix: "Help with task management: ",
        plan_rules: vec![
            PlanRule {
                triggers: &["extract", "from", "meeting", "email", "notes"],
                step: "Extract actionable tasks from the provided text",
                tool: Some("extract_tasks"),
            },
            PlanRule {
                triggers: &["prioritize", "priority", "order", "important", "urgent"],
                step: "Analyze and prioritize tasks",
                tool: Some("prioritize_tasks"),
            },
            PlanRule {
                triggers: &["break", "breakdown", "split", "subtask"],
                step: "Break down complex task into subtasks",
                tool: Some("breakdown_task"),
            },
            PlanRule {
                triggers: &["schedule", "when", "plan", "calendar"],
                step: "Suggest optimal scheduling",
                tool: Some("schedule_tasks"),
            },
        ],
        default_step: "Analyze request and provide task management assistance",
        complexity: Complexity::StepsPlus(0),
        handoffs: Vec::new(),
        prompt_context: PromptContext::UserTasks,
        guidance: "Please help with this task management request. If asked to extract tasks, provide them in a structured format.\nIf asked to prioritize, explain your reasoning. Be specific and actionable.",
        suggestions: Suggestions::TaskBoard,
    }
}

fn project() -> Persona {
    let descriptor = ProviderDescriptor::new(
        ProviderType::Project,
        "Project Manager",
        "Helps you manage academic projects, track progress, and stay on schedule",
    )
    .with_capabilities(capabilities(&[
        ("summarize_project", "Generate a status summary with accomplishments and blockers"),
        ("suggest_milestones", "Suggest milestones appropriate to the project stage"),
        ("assess_health", "Assess project health and flag risks"),
        ("link_tasks", "Link tasks to projects and milestones"),
        ("suggest_next_steps", "Suggest concrete next steps"),
    ]))
    .with_tools(tools(&[
        ("summarize_project", "Summarize a project's status, accomplishments and blockers"),
        ("suggest_milestones", "Suggest milestones for a project given its type and stage"),
        ("assess_health", "Assess a project's health and identify risks"),
    ]))
    .with_keywords([
        "project", "manuscript", "paper", "research", "milestone", "progress", "status", "summary",
        "health", "risk", "deadline", "stage", "publication", "submission", "revision", "track",
        "update", "next steps",
    ]);

    Persona {
        descriptor,
        system_prompt: prompts::PROJECT_PROMPT,
        temperature: 0.4,
        max_tokens: 3500,
        goal_prefix: "Assist with project: ",
        plan_rules: vec![
            PlanRule {
                triggers: &["summary", "status", "progress", "update"],
                step: "Generate project summary with accomplishments and blockers",
                tool: Some("summarize_project"),
            },
            PlanRule {
                triggers: &["milestone", "stage", "next step"],
                step: "Suggest relevant milestones",
                tool: Some("suggest_milestones"),
            },
            PlanRule {
                triggers: &["health", "risk", "concern", "problem"],
                step: "Assess project health and risks",
                tool: Some("assess_health"),
            },
        ],
        default_step: "Provide project management guidance",
        complexity: Complexity::StepsPlus(1),
        handoffs: vec![
            HandoffRule {
                triggers: &["grant proposal", "funding", "nih", "nsf", "budget", "specific aims"],
                to: ProviderType::Grant,
                reason: "Request involves grant-specific details",
                flag: None,
            },
            HandoffRule {
                triggers: &["write", "draft", "abstract", "introduction", "methods"],
                to: ProviderType::Writing,
                reason: "Request involves content creation",
                flag: None,
            },
        ],
        prompt_context: PromptContext::UserProjects,
        guidance: "Please help with this project management request. Provide specific, actionable guidance.\nIf summarizing, include accomplishments, blockers, and clear next steps.\nIf suggesting milestones, explain why each milestone is important.",
        suggestions: Suggestions::Projects,
    }
}

fn grant() -> Persona {
    let descriptor = ProviderDescriptor::new(
        ProviderType::Grant,
        "Grant Assistant",
        "Helps you find grants, assess fit, and write proposals",
    )
    .with_capabilities(capabilities(&[
        ("search_opportunities", "Search funding opportunities"),
        ("analyze_fit", "Analyze fit between an opportunity and the researcher's profile"),
        ("track_deadlines", "Track deadlines and build preparation timelines"),
        ("draft_specific_aims", "Draft a specific aims page"),
        ("check_eligibility", "Check eligibility requirements"),
        ("budget_assistance", "Help plan and justify a budget"),
    ]))
    .with_tools(tools(&[
        ("analyze_fit", "Analyze how well a funding opportunity fits the researcher"),
        ("draft_specific_aims", "Draft a specific aims page for a proposal"),
        ("analyze_deadlines", "Analyze deadlines and create a preparation timeline"),
    ]))
    .with_keywords([
        "grant", "funding", "proposal", "nih", "nsf", "r01", "r21", "specific aims", "budget",
        "eligibility", "deadline", "opportunity", "application", "submission", "award",
        "fellowship", "career", "k99", "f31",
    ]);

    Persona {
        descriptor,
        system_prompt: prompts::GRANT_PROMPT,
        temperature: 0.4,
        max_tokens: 4000,
        goal_prefix: "Assist with grants: ",
        plan_rules: vec![
            PlanRule {
                triggers: &["fit", "match", "suitable", "good for me"],
                step: "Analyze fit between opportunity and profile",
                tool: Some("analyze_fit"),
            },
            PlanRule {
                triggers: &["specific aims", "aims page"],
                step: "Draft specific aims page",
                tool: Some("draft_specific_aims"),
            },
            PlanRule {
                triggers: &["deadline", "timeline", "when", "prepare"],
                step: "Analyze deadlines and create timeline",
                tool: Some("analyze_deadlines"),
            },
            PlanRule {
                triggers: &["search", "find", "discover", "opportunities"],
                step: "Search for relevant funding opportunities",
                tool: None,
            },
        ],
        default_step: "Provide grant-related guidance",
        complexity: Complexity::StepsPlus(2),
        handoffs: vec![
            HandoffRule {
                triggers: &["write full", "complete draft", "significance section", "innovation"],
                to: ProviderType::Writing,
                reason: "Request involves extensive writing beyond specific aims",
                flag: Some("grant_context"),
            },
            HandoffRule {
                triggers: &["find papers", "literature", "preliminary data", "citations"],
                to: ProviderType::Research,
                reason: "Request involves literature/research support",
                flag: Some("grant_context"),
            },
        ],
        prompt_context: PromptContext::ResearcherProfile,
        guidance: "Please help with this grant-related request. Be specific and actionable.\nIf analyzing fit, provide a clear score and rationale.\nIf discussing deadlines, create a realistic preparation timeline.",
        suggestions: Suggestions::Grants,
    }
}

fn research() -> Persona {
    let descriptor = ProviderDescriptor::new(
        ProviderType::Research,
        "Research Assistant",
        "Helps with literature search, paper summaries, and research planning",
    )
    .with_capabilities(capabilities(&[
        ("search_literature", "Search academic literature"),
        ("summarize_paper", "Summarize a paper's contributions and methods"),
        ("find_related_work", "Find related work and citations"),
        ("identify_gaps", "Identify gaps in the literature"),
        ("suggest_methodology", "Suggest methodology approaches"),
    ]))
    .with_keywords([
        "literature", "paper", "citation", "research", "methodology", "study", "findings",
        "abstract", "review", "related work",
    ]);

    Persona {
        descriptor,
        system_prompt: prompts::RESEARCH_PROMPT,
        temperature: 0.3,
        max_tokens: 4000,
        goal_prefix: "Research support: ",
        plan_rules: Vec::new(),
        default_step: "Analyze research request and provide guidance",
        complexity: Complexity::Fixed(2),
        handoffs: Vec::new(),
        prompt_context: PromptContext::None,
        guidance: "Please help with this research-related request. Provide thorough, academic-quality guidance.",
        suggestions: Suggestions::None,
    }
}

fn calendar() -> Persona {
    let descriptor = ProviderDescriptor::new(
        ProviderType::Calendar,
        "Calendar Assistant",
        "Helps manage your schedule, meetings, and time blocking",
    )
    .with_capabilities(capabilities(&[
        ("check_availability", "Check availability across calendars"),
        ("schedule_meeting", "Find a time and schedule a meeting"),
        ("create_time_blocks", "Create focused work blocks"),
        ("sync_deadlines", "Sync task deadlines with the calendar"),
        ("suggest_schedule", "Suggest a schedule for the week"),
    ]))
    .with_keywords([
        "calendar", "schedule", "meeting", "time", "availability", "block", "appointment", "busy",
        "free", "when",
    ]);

    Persona {
        descriptor,
        system_prompt: prompts::CALENDAR_PROMPT,
        temperature: 0.3,
        max_tokens: 2500,
        goal_prefix: "Calendar management: ",
        plan_rules: Vec::new(),
        default_step: "Analyze scheduling request and provide guidance",
        complexity: Complexity::Fixed(2),
        handoffs: Vec::new(),
        prompt_context: PromptContext::None,
        guidance: "Help with this calendar/scheduling request. Be specific about times and dates.",
        suggestions: Suggestions::None,
    }
}

fn writing() -> Persona {
    let descriptor = ProviderDescriptor::new(
        ProviderType::Writing,
        "Writing Assistant",
        "Helps with academic writing, editing, and document formatting",
    )
    .with_capabilities(capabilities(&[
        ("draft_section", "Draft a section of a paper or proposal"),
        ("edit_text", "Edit text for clarity and style"),
        ("suggest_improvements", "Suggest structural improvements"),
        ("generate_abstract", "Generate an abstract"),
        ("create_outline", "Create a document outline"),
    ]))
    .with_keywords([
        "write", "draft", "edit", "abstract", "outline", "paragraph", "section", "improve",
        "rewrite", "grammar", "introduction", "methods", "results", "discussion", "conclusion",
    ]);

    Persona {
        descriptor,
        system_prompt: prompts::WRITING_PROMPT,
        temperature: 0.5,
        max_tokens: 4000,
        goal_prefix: "Writing assistance: ",
        plan_rules: Vec::new(),
        default_step: "Analyze writing request and provide assistance",
        complexity: Complexity::Fixed(3),
        handoffs: Vec::new(),
        prompt_context: PromptContext::None,
        guidance: "Help with this writing request. Follow academic writing best practices.\nIf editing, preserve the author's voice while improving clarity.",
        suggestions: Suggestions::None,
    }
}

fn personnel() -> Persona {
    let descriptor = ProviderDescriptor::new(
        ProviderType::Personnel,
        "Personnel Assistant",
        "Helps manage team members, mentoring, and lab personnel",
    )
    .with_capabilities(capabilities(&[
        ("track_meetings", "Track mentee meetings and notes"),
        ("suggest_topics", "Suggest mentoring discussion topics"),
        ("assess_workload", "Assess team workload"),
        ("generate_report", "Generate a progress report for a team member"),
        ("schedule_checkins", "Schedule regular check-ins"),
    ]))
    .with_keywords([
        "student", "mentee", "lab", "team", "personnel", "phd", "postdoc", "meeting", "progress",
        "mentoring",
    ]);

    Persona {
        descriptor,
        system_prompt: prompts::PERSONNEL_PROMPT,
        temperature: 0.4,
        max_tokens: 3000,
        goal_prefix: "Personnel management: ",
        plan_rules: Vec::new(),
        default_step: "Analyze personnel request and provide guidance",
        complexity: Complexity::Fixed(2),
        handoffs: Vec::new(),
        prompt_context: PromptContext::None,
        guidance: "Help with this personnel/mentoring request. Be specific and actionable.",
        suggestions: Suggestions::None,
    }
}

fn planner() -> Persona {
    let descriptor = ProviderDescriptor::new(
        ProviderType::Planner,
        "Planning Assistant",
        "Helps with goal setting, strategic planning, and general guidance",
    )
    .with_capabilities(capabilities(&[
        ("create_goal", "Create a long-term goal"),
        ("break_down_goal", "Break a goal into milestones"),
        ("track_progress", "Track progress toward goals"),
        ("generate_plan", "Generate weekly or monthly plans"),
        ("analyze_patterns", "Analyze productivity patterns"),
        ("general_guidance", "Provide general guidance"),
    ]))
    .with_keywords([
        "plan", "goal", "strategy", "career", "long-term", "week", "month", "quarter", "year",
        "priorities", "help", "what should", "how do i", "advice",
    ]);

    fn handoff(triggers: &'static [&'static str], to: ProviderType, reason: &'static str) -> HandoffRule {
        HandoffRule {
            triggers,
            to,
            reason,
            flag: None,
        }
    }

    Persona {
        descriptor,
        system_prompt: prompts::PLANNER_PROMPT,
        temperature: 0.4,
        max_tokens: 3500,
        goal_prefix: "Planning assistance: ",
        plan_rules: Vec::new(),
        default_step: "Analyze request and provide strategic guidance",
        complexity: Complexity::Fixed(2),
        handoffs: vec![
            handoff(
                &["task", "todo", "action item", "extract from"],
                ProviderType::Task,
                "Request is more appropriate for task agent",
            ),
            handoff(
                &["project", "manuscript", "paper status"],
                ProviderType::Project,
                "Request is more appropriate for project agent",
            ),
            handoff(
                &["grant", "funding", "proposal", "nih", "nsf"],
                ProviderType::Grant,
                "Request is more appropriate for grant agent",
            ),
            handoff(
                &["literature", "paper", "citation"],
                ProviderType::Research,
                "Request is more appropriate for research agent",
            ),
            handoff(
                &["calendar", "schedule", "meeting", "availability"],
                ProviderType::Calendar,
                "Request is more appropriate for calendar agent",
            ),
            handoff(
                &["write", "draft", "edit", "abstract"],
                ProviderType::Writing,
                "Request is more appropriate for writing agent",
            ),
            handoff(
                &["student", "mentee", "lab member", "postdoc"],
                ProviderType::Personnel,
                "Request is more appropriate for personnel agent",
            ),
        ],
        prompt_context: PromptContext::Overview,
        guidance: "Provide helpful, actionable guidance. If this request would be better handled by a specialized assistant\n(tasks, projects, grants, research, calendar, writing, or personnel), mention that.\nOtherwise, provide strategic planning support.",
        suggestions: Suggestions::None,
    }
}
