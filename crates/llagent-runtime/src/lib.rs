//! The agent execution core: the model↔tools state machine, the subagent
//! runner, and the session manager.
//!
//! An [`AgentLoop`] drives one conversation: it posts the history and tool
//! schemas to the model backend, streams deltas out as events, gates every
//! tool call through the permission engine, executes it, and appends the
//! result until the model stops calling tools or a stop condition trips.
//! [`SubagentRunner`] re-enters the loop recursively with restricted tools;
//! [`SessionManager`] owns long-lived loops keyed by id for the HTTP
//! surface.

pub mod agent_loop;
pub mod api_resolver;
pub mod config;
pub mod emitter;
pub mod errors;
pub mod interrupt;
pub mod prompts;
pub mod session;
pub mod session_manager;
pub mod subagent;

pub use agent_loop::{AgentLoop, LoopResult, ToolCallCallback};
pub use api_resolver::ApiResolver;
pub use config::AgentConfig;
pub use emitter::EventEmitter;
pub use errors::RuntimeError;
pub use interrupt::Interrupt;
pub use session::{Session, SessionState};
pub use session_manager::{SessionConfig, SessionInfo, SessionManager};
pub use subagent::runner::SubagentRunner;

use std::sync::Arc;

use llagent_llm::ModelBackend;
use llagent_permissions::{AskResolver, PolicyEngine};
use llagent_tools::ToolRegistry;

/// Compose a root agent loop with its policy engine and (when enabled) a
/// subagent runner wired into the tool context.
#[must_use]
pub fn build_root_loop(
    backend: Arc<dyn ModelBackend>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
    resolver: Arc<dyn AskResolver>,
    emitter: Arc<EventEmitter>,
    interrupt: Arc<Interrupt>,
) -> AgentLoop {
    let policy = PolicyEngine::new(&config.working_dir, config.yolo).into_shared();
    build_root_loop_with_policy(backend, registry, config, policy, resolver, emitter, interrupt)
}

/// Like [`build_root_loop`] but sharing an existing policy engine (the
/// session manager pairs the loop with an async permission engine over the
/// same policy).
#[must_use]
pub fn build_root_loop_with_policy(
    backend: Arc<dyn ModelBackend>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
    policy: llagent_permissions::SharedPolicy,
    resolver: Arc<dyn AskResolver>,
    emitter: Arc<EventEmitter>,
    interrupt: Arc<Interrupt>,
) -> AgentLoop {
    let mut agent_loop = AgentLoop::new_root(
        backend.clone(),
        registry.clone(),
        config.clone(),
        policy,
        resolver.clone(),
        emitter,
        interrupt.clone(),
    );

    if config.enable_subagents {
        let runner = SubagentRunner::new(
            backend,
            registry,
            config,
            prompts::BASE_SYSTEM_PROMPT.to_owned(),
            resolver,
            agent_loop.stats_handle(),
            interrupt,
        );
        agent_loop.set_spawner(runner);
    }

    agent_loop
}
