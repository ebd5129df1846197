use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use devdeck_api::ServiceConfig;
use devdeck_engine::{RunContext, TaskCatalog};
use devdeck_server::{AppState, DevdeckServer, ServerConfig, Services};
use devdeck_types::ChatMessage;
use serde_json::{Map, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "devdeck", version, about = "Orchestrate GitHub, Vercel, chat planning and mobile builds")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the dashboard API until interrupted.
    Serve {
        /// Listen address (defaults to DEVDECK_BIND or 127.0.0.1:3000).
        #[arg(long)]
        bind: Option<String>,
        /// Task configuration file.
        #[arg(long)]
        tasks: Option<PathBuf>,
        /// Mobile project directory (defaults to DEVDECK_MOBILE_DIR or the current directory).
        #[arg(long)]
        mobile_dir: Option<PathBuf>,
    },
    /// List the configured tasks.
    Tasks {
        #[arg(long)]
        tasks: Option<PathBuf>,
    },
    /// Run a task and print the report.
    Run {
        task: String,
        /// Task variable as key=value; repeatable.
        #[arg(long = "var", value_parser = parse_variable)]
        vars: Vec<(String, String)>,
        /// Project id used to persist step outcomes.
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        tasks: Option<PathBuf>,
    },
    /// Send one message through the planner and print the reply.
    Chat { message: String },
}

fn parse_variable(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw.split_once('=').ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("variable name is empty in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Serve { bind, tasks, mobile_dir } => serve(bind.as_deref(), tasks.as_deref(), mobile_dir).await,
        Command::Tasks { tasks } => list_tasks(tasks.as_deref()),
        Command::Run {
            task,
            vars,
            project,
            tasks,
        } => run_task(&task, vars, project, tasks.as_deref()).await,
        Command::Chat { message } => chat(message).await,
    }
}

const DEFAULT_LOG_FILTER: &str = "info";

/// `RUST_LOG` directives, or `info` when unset, blank or unparsable.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|raw| !raw.trim().is_empty())
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_tracing() {
    let directives = std::env::var("RUST_LOG").ok();
    let _ = tracing_subscriber::fmt().with_env_filter(log_filter(directives.as_deref())).try_init();
}

fn build_state(tasks: Option<&Path>, mobile_dir: &Path) -> Result<AppState> {
    let catalog = Arc::new(TaskCatalog::resolve(tasks)?);
    let services = Services::from_config(&ServiceConfig::from_env(), mobile_dir)?;
    Ok(AppState::new(services, catalog))
}

async fn serve(bind: Option<&str>, tasks: Option<&Path>, mobile_dir: Option<PathBuf>) -> Result<()> {
    let config = ServerConfig::resolve(bind, mobile_dir)?;
    let state = build_state(tasks, &config.mobile_dir)?;
    let running = DevdeckServer::new(config.bind_address, state).start().await?;
    info!(address = %running.bound_address(), mobile_dir = %config.mobile_dir.display(), "press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("listen for Ctrl-C")?;
    info!("shutting down");
    running.stop().await
}

fn list_tasks(tasks: Option<&Path>) -> Result<()> {
    let catalog = TaskCatalog::resolve(tasks)?;
    for task in catalog.tasks() {
        let actions: Vec<&str> = task.steps.iter().map(|step| step.action.as_str()).collect();
        match task.description.as_deref() {
            Some(description) => println!("{}  {}\n    {}", task.name, description, actions.join(" -> ")),
            None => println!("{}\n    {}", task.name, actions.join(" -> ")),
        }
    }
    Ok(())
}

async fn run_task(task: &str, vars: Vec<(String, String)>, project: Option<String>, tasks: Option<&Path>) -> Result<()> {
    let mobile_dir = ServerConfig::resolve(None, None)?.mobile_dir;
    let state = build_state(tasks, &mobile_dir)?;
    let variables: Map<String, Value> = vars.into_iter().map(|(key, value)| (key, Value::String(value))).collect();
    let report = state
        .workflows
        .run(task, RunContext::new(variables, project))
        .await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn chat(message: String) -> Result<()> {
    let mobile_dir = ServerConfig::resolve(None, None)?.mobile_dir;
    let state = build_state(None, &mobile_dir)?;
    let reply = state
        .planning
        .respond(&[ChatMessage::user(message)])
        .await?;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
