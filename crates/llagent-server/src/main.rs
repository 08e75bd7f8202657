//! `llagent-server` binary: the agent HTTP API over a llama-server
//! backend.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use llagent_llm::LlamaServer;
use llagent_mcp::McpManager;
use llagent_runtime::session_manager::prepare_prompt_sections;
use llagent_runtime::{AgentConfig, SessionManager};
use llagent_server::serve;
use llagent_tools::{register_builtin_tools, ToolRegistry};

/// Agent API server.
#[derive(Debug, Parser)]
#[command(name = "llagent-server", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8090")]
    addr: SocketAddr,

    /// Base URL of the llama-server inference endpoint.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Working directory for sessions (default: current directory).
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Auto-approve every permission check.
    #[arg(long)]
    yolo: bool,

    /// Iteration cap per message (clamped to 1..=1000).
    #[arg(long, default_value_t = 50)]
    max_iterations: u32,

    /// Disable subagents.
    #[arg(long)]
    no_subagents: bool,

    /// Maximum subagent nesting depth (clamped to 0..=5).
    #[arg(long, default_value_t = 1)]
    max_subagent_depth: u32,

    /// Disable skills discovery.
    #[arg(long)]
    no_skills: bool,

    /// Disable AGENTS.md discovery.
    #[arg(long)]
    no_agents_md: bool,

    /// Extra skill search path (repeatable).
    #[arg(long = "skills-path")]
    skills_paths: Vec<PathBuf>,

    /// Disable MCP server startup.
    #[arg(long)]
    no_mcp: bool,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let working_dir = match args.working_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let mut config = AgentConfig {
        max_iterations: args.max_iterations.clamp(1, 1000),
        working_dir: working_dir.clone(),
        yolo: args.yolo,
        enable_subagents: !args.no_subagents,
        max_subagent_depth: args.max_subagent_depth.min(5),
        enable_skills: !args.no_skills,
        skills_paths: args.skills_paths,
        enable_agents_md: !args.no_agents_md,
        ..Default::default()
    };
    prepare_prompt_sections(&mut config);

    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry);

    // Held for the process lifetime so MCP server processes stay up.
    let mut mcp_guard: Option<McpManager> = None;
    if !args.no_mcp {
        if let Some(config_path) = llagent_mcp::find_config(&working_dir) {
            let mut mcp = McpManager::new(&working_dir);
            match mcp.load(&config_path) {
                Ok(()) => {
                    let started = mcp.start_servers().await;
                    let registered = mcp.register_tools(&mut registry).await;
                    info!(started, registered, "MCP servers initialized");
                    mcp_guard = Some(mcp);
                }
                Err(e) => warn!(error = %e, "failed to load mcp.json"),
            }
        }
    }
    let _mcp = mcp_guard;

    let backend = Arc::new(LlamaServer::new(args.server));
    let sessions = Arc::new(SessionManager::new(backend, Arc::new(registry), config));

    serve(args.addr, sessions).await
}
