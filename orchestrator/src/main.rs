//! Orchestrator CLI
//!
//! Routes chat turns, runs single provider tasks and executes workflows.
//!
//! Usage:
//!   orchestrator agents list
//!   orchestrator agents show grant
//!   orchestrator chat "Find funding for my lab" --provider grant
//!   orchestrator task task extract --input '{"text": "..."}' --detach
//!   orchestrator workflow list
//!   orchestrator workflow show email-to-tasks
//!   orchestrator workflow run email-to-tasks --input '{"email_content": "..."}'

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orchestrator::{
    builtin_workflows, load_custom_workflows, ChatRequest, ExecuteTaskRequest, Orchestrator, OrchestratorError,
    Registry, WorkflowDefinition,
};
use scholar_agent::config::AgentFileConfig;
use scholar_agent::llm::OllamaClient;
use scholar_agent::{ExecutionContext, JsonMap, ProviderType};

#[derive(Parser)]
#[command(name = "orchestrator")]
#[command(about = "Multi-provider orchestration for the scholar agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_URL", global = true)]
    ollama_url: Option<String>,

    /// Model to use for every persona
    #[arg(short = 'm', long, env = "OLLAMA_MODEL", global = true)]
    model: Option<String>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Agent listing
    Agents {
        #[command(subcommand)]
        command: AgentCommands,
    },
    /// Send one chat message
    Chat {
        message: String,

        /// Skip routing and use this agent type
        #[arg(long)]
        provider: Option<String>,

        #[arg(long)]
        session: Option<String>,
    },
    /// Run a single task on an agent
    Task {
        /// Agent type (task, project, grant, ...)
        provider: String,

        /// Task type, e.g. "extract"
        task_type: String,

        /// Task input as a JSON object
        #[arg(long, short)]
        input: Option<String>,

        /// Run in the background and poll for the result
        #[arg(long)]
        detach: bool,
    },
    /// Workflow management and execution
    Workflow {
        #[command(subcommand)]
        command: WorkflowCommands,
    },
}

#[derive(Subcommand)]
enum AgentCommands {
    /// List available agents
    List,
    /// Show one agent
    Show {
        /// Agent type
        agent: String,
    },
}

#[derive(Subcommand)]
enum WorkflowCommands {
    /// List available workflows
    List,
    /// Show workflow definition
    Show { workflow: String },
    /// Run a workflow
    Run {
        /// Workflow id, or path to a .toml/.json definition
        workflow: String,

        /// Workflow input as a JSON object
        #[arg(long, short)]
        input: Option<String>,
    },
}

/// Initialize tracing with the given verbosity level
///
/// - 0: warn (default)
/// - 1: info (-v)
/// - 2: debug (-vv)
/// - 3+: trace (-vvv)
fn init_tracing(verbosity: u8, json: bool) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    // Allow RUST_LOG to override if set
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let file_config = AgentFileConfig::load()?;
    let ollama_url = cli.ollama_url.unwrap_or_else(|| file_config.llm.url.clone());
    let model = cli.model.unwrap_or_else(|| file_config.llm.model.clone());

    let default_provider: ProviderType = file_config
        .engine
        .default_provider
        .parse()
        .context("Invalid engine.default_provider in config")?;

    let llm = Arc::new(OllamaClient::new(&ollama_url, &model));
    let registry = Arc::new(Registry::with_defaults(llm));
    let orchestrator = Orchestrator::new(registry)
        .with_default_provider(default_provider)
        .with_step_timeout(Duration::from_secs(file_config.engine.default_step_timeout_secs));

    let context = ExecutionContext::default();

    match cli.command {
        Commands::Agents { command } => run_agents_command(command, &orchestrator),
        Commands::Chat {
            message,
            provider,
            session,
        } => {
            let mut request = ChatRequest::new(message);
            request.provider_type = provider;
            request.session_id = session;
            let response = orchestrator.chat(&request, &context).await?;
            print_json(&response)
        }
        Commands::Task {
            provider,
            task_type,
            input,
            detach,
        } => {
            let mut request = ExecuteTaskRequest::new(provider, task_type).with_input(parse_input(input.as_deref())?);
            request.async_execution = detach;
            let response = orchestrator.execute_task(&request, &context).await;
            print_json(&response)?;

            if detach {
                // Keep the process alive until the background task settles
                let mut ticker = tokio::time::interval(Duration::from_millis(250));
                loop {
                    ticker.tick().await;
                    match orchestrator.task_status(&response.task_id) {
                        Some(snapshot) if snapshot.status.is_terminal() => return print_json(&snapshot),
                        Some(_) => continue,
                        None => return Ok(()),
                    }
                }
            }
            Ok(())
        }
        Commands::Workflow { command } => {
            run_workflow_command(command, &orchestrator, &context, file_config.engine.workflows_dir.as_deref()).await
        }
    }
}

fn run_agents_command(command: AgentCommands, orchestrator: &Orchestrator) -> Result<()> {
    match command {
        AgentCommands::List => {
            println!("Available Agents:\n");
            for info in orchestrator.get_provider_info() {
                println!("  {} - {}", info.provider_type, info.name);
                if !info.tools.is_empty() {
                    println!("    Tools: {}", info.tools.join(", "));
                }
            }
            Ok(())
        }
        AgentCommands::Show { agent } => {
            let provider_type: ProviderType = agent.parse()?;
            let info = orchestrator
                .get_provider_info()
                .into_iter()
                .find(|info| info.provider_type == provider_type)
                .ok_or(OrchestratorError::ProviderNotRegistered(provider_type))?;
            print_json(&info)
        }
    }
}

async fn run_workflow_command(
    command: WorkflowCommands,
    orchestrator: &Orchestrator,
    context: &ExecutionContext,
    configured_dir: Option<&Path>,
) -> Result<()> {
    let catalog = workflow_catalog(configured_dir);

    match command {
        WorkflowCommands::List => {
            println!("Available Workflows:\n");
            let mut ids: Vec<&String> = catalog.keys().collect();
            ids.sort();
            for id in ids {
                let workflow = &catalog[id];
                println!("  {} - {}", id, workflow.description);
            }
            println!("\nRun a workflow with: orchestrator workflow run <id> --input '{{...}}'");
            Ok(())
        }
        WorkflowCommands::Show { workflow } => {
            let definition = catalog
                .get(&workflow)
                .ok_or_else(|| OrchestratorError::WorkflowNotFound(workflow.clone()))?;
            print_json(definition)
        }
        WorkflowCommands::Run { workflow, input } => {
            let definition = resolve_workflow(&catalog, &workflow)?;
            let input = parse_input(input.as_deref())?;
            let response = orchestrator.orchestrate(&definition, &input, context).await;
            print_json(&response)
        }
    }
}

/// Built-in workflows, overlaid by the configured and global workflow directories
fn workflow_catalog(configured_dir: Option<&Path>) -> HashMap<String, WorkflowDefinition> {
    let mut catalog = builtin_workflows();

    let global_dir = dirs::config_dir().map(|dir| dir.join("scholar").join("workflows"));
    let search_dirs: Vec<PathBuf> = global_dir
        .into_iter()
        .chain(configured_dir.map(Path::to_path_buf))
        .collect();

    for dir in search_dirs {
        match load_custom_workflows(&dir) {
            Ok(custom) => catalog.extend(custom),
            Err(e) => tracing::warn!("Failed to read workflows from {:?}: {}", dir, e),
        }
    }

    catalog
}

fn resolve_workflow(catalog: &HashMap<String, WorkflowDefinition>, name: &str) -> Result<WorkflowDefinition> {
    if let Some(definition) = catalog.get(name) {
        return Ok(definition.clone());
    }
    let path = Path::new(name);
    if path.is_file() {
        return Ok(WorkflowDefinition::from_file(path)?);
    }
    Err(OrchestratorError::WorkflowNotFound(name.to_string()).into())
}

fn parse_input(raw: Option<&str>) -> Result<JsonMap> {
    match raw {
        Some(raw) => serde_json::from_str(raw).context("Input must be a JSON object"),
        None => Ok(JsonMap::new()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
