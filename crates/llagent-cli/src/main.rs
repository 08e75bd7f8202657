//! `llagent` binary: interactive coding assistant over a llama-server
//! endpoint.

mod args;
mod render;
mod repl;

use std::sync::Arc;

use clap::Parser;
use tracing::warn;

use llagent_llm::LlamaServer;
use llagent_mcp::McpManager;
use llagent_permissions::{PolicyEngine, TtyResolver};
use llagent_runtime::session_manager::config_dir;
use llagent_runtime::{build_root_loop_with_policy, AgentConfig, EventEmitter, Interrupt};
use llagent_skills::{AgentsMdManager, SkillsManager};
use llagent_tools::{register_builtin_tools, ToolRegistry};

use args::Args;
use repl::Repl;

const LOGO: &str = r"  _ _                                         _
 | | | __ _ _ __ ___   __ _     __ _  __ _  ___ _ __ | |_
 | | |/ _` | '_ ` _ \ / _` |   / _` |/ _` |/ _ \ '_ \| __|
 | | | (_| | | | | | | (_| |  | (_| | (_| |  __/ | | | |_
 |_|_|\__,_|_| |_| |_|\__,_|   \__,_|\__, |\___|_| |_|\__|
                                     |___/";

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args = Args::parse();

    let working_dir = match &args.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    // Prompt-time discovery (kept around for /skills and /agents).
    let mut agents_md = AgentsMdManager::new();
    if !args.no_agents_md {
        let _ = agents_md.discover(&working_dir, config_dir().as_deref());
    }
    let mut skills = SkillsManager::new();
    if !args.no_skills {
        let mut paths = vec![working_dir.join("skills")];
        if let Some(dir) = config_dir() {
            paths.push(dir.join("skills"));
        }
        paths.extend(args.skills_paths.iter().cloned());
        let _ = skills.discover(&paths);
    }

    let config = AgentConfig {
        max_iterations: args.clamped_max_iterations(),
        tool_timeout_ms: 120_000,
        working_dir: working_dir.clone(),
        verbose: args.verbose,
        yolo: args.yolo,
        enable_subagents: args.subagents_enabled(),
        max_subagent_depth: args.clamped_max_subagent_depth(),
        enable_skills: !args.no_skills,
        skills_paths: args.skills_paths.clone(),
        skills_prompt_section: skills.prompt_section(),
        enable_agents_md: !args.no_agents_md,
        agents_md_prompt_section: agents_md.prompt_section(),
    };

    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry);

    // MCP servers from mcp.json (working dir, then ~/.llama-agent).
    let mut mcp_guard: Option<McpManager> = None;
    if let Some(config_path) = llagent_mcp::find_config(&working_dir) {
        let mut mcp = McpManager::new(&working_dir);
        match mcp.load(&config_path) {
            Ok(()) => {
                let _ = mcp.start_servers().await;
                let _ = mcp.register_tools(&mut registry).await;
                mcp_guard = Some(mcp);
            }
            Err(e) => warn!(error = %e, "failed to load mcp.json"),
        }
    }
    let _mcp = mcp_guard;
    let registry = Arc::new(registry);

    let backend = Arc::new(LlamaServer::new(args.server.clone()));
    let policy = PolicyEngine::new(&working_dir, args.yolo).into_shared();
    let resolver = Arc::new(TtyResolver::new(policy.clone()));
    let emitter = Arc::new(EventEmitter::new());
    let interrupt = Arc::new(Interrupt::new());

    let agent = build_root_loop_with_policy(
        backend,
        registry.clone(),
        config,
        policy,
        resolver,
        emitter.clone(),
        interrupt.clone(),
    );

    // First Ctrl-C interrupts the generation; a second one while still
    // interrupted exits with status 130.
    {
        let interrupt = interrupt.clone();
        let _ = tokio::spawn(async move {
            loop {
                if tokio::signal::ctrl_c().await.is_err() {
                    break;
                }
                if interrupt.is_triggered() {
                    println!();
                    std::process::exit(130);
                }
                interrupt.trigger();
            }
        });
    }

    println!("{LOGO}");
    println!("server     : {}", args.server);
    println!("working dir: {}", working_dir.display());
    if args.yolo {
        println!("mode       : YOLO (all permissions auto-approved)");
    }
    println!("\nType a request, or /exit, /clear, /tools, /skills, /agents.");

    let mut repl = Repl {
        agent,
        emitter,
        interrupt,
        registry,
        skills,
        agents_md,
        color: true,
    };
    repl.run().await
}
