//! One long-lived agent session.
//!
//! A session owns an agent loop, an async permission engine over the same
//! policy core, and at most one worker task driving the loop. Sends are
//! serialised by joining the previous worker before spawning the next, so
//! exactly one actor mutates the conversation at a time.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::debug;

use llagent_core::{ChatMessage, SessionStats, StopReason};
use llagent_llm::ModelBackend;
use llagent_permissions::{
    AsyncPermissionEngine, PendingPermission, PermissionScope, PolicyEngine,
};
use llagent_tools::ToolRegistry;

use crate::agent_loop::{AgentLoop, LoopResult};
use crate::api_resolver::ApiResolver;
use crate::build_root_loop_with_policy;
use crate::config::AgentConfig;
use crate::emitter::EventEmitter;
use crate::interrupt::Interrupt;

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No worker running.
    Idle,
    /// A worker is driving the loop.
    Running,
    /// The loop is parked on a permission decision.
    WaitingPermission,
    /// The last run completed normally.
    Completed,
    /// The last run ended with an agent error.
    Error,
}

impl SessionState {
    /// Whether a new message may be sent without interrupting work.
    #[must_use]
    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Running | Self::WaitingPermission)
    }
}

/// A session: loop + permissions + worker.
pub struct Session {
    id: String,
    agent: Arc<tokio::sync::Mutex<AgentLoop>>,
    permissions: Arc<AsyncPermissionEngine>,
    emitter: Arc<EventEmitter>,
    interrupt: Arc<Interrupt>,
    state: Arc<Mutex<SessionState>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    stats: Arc<Mutex<SessionStats>>,
    last_result: Arc<Mutex<Option<LoopResult>>>,
    created_at: Instant,
    last_activity: Arc<Mutex<Instant>>,
}

impl Session {
    /// Build a session around a root loop using the async permission
    /// driver.
    #[must_use]
    pub fn new(
        id: String,
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Arc<Self> {
        let policy = PolicyEngine::new(&config.working_dir, config.yolo).into_shared();
        let permissions = Arc::new(AsyncPermissionEngine::new(policy.clone()));
        let emitter = Arc::new(EventEmitter::new());
        let interrupt = Arc::new(Interrupt::new());
        let resolver = Arc::new(ApiResolver::new(permissions.clone(), emitter.clone()));

        let agent = build_root_loop_with_policy(
            backend,
            registry,
            config,
            policy,
            resolver,
            emitter.clone(),
            interrupt.clone(),
        );
        let messages = agent.messages_handle();
        let stats = agent.stats_handle();

        let state = Arc::new(Mutex::new(SessionState::Idle));
        {
            // Park the session in WAITING_PERMISSION while an ASK is
            // pending; respond flips it back to RUNNING.
            let state = state.clone();
            permissions.set_callback(Box::new(move |_pending| {
                *state.lock() = SessionState::WaitingPermission;
            }));
        }

        Arc::new(Self {
            id,
            agent: Arc::new(tokio::sync::Mutex::new(agent)),
            permissions,
            emitter,
            interrupt,
            state,
            worker: tokio::sync::Mutex::new(None),
            messages,
            stats,
            last_result: Arc::new(Mutex::new(None)),
            created_at: Instant::now(),
            last_activity: Arc::new(Mutex::new(Instant::now())),
        })
    }

    /// Session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Subscribe to the session's event stream.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<llagent_core::AgentEvent> {
        self.emitter.subscribe()
    }

    /// Send a user message: join any prior worker, then spawn a new one
    /// driving the loop.
    pub async fn send_message(&self, content: String) {
        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.take() {
            let _ = handle.await;
        }

        self.interrupt.reset();
        *self.state.lock() = SessionState::Running;
        self.touch();
        debug!(session_id = %self.id, "worker starting");

        let agent = self.agent.clone();
        let state = self.state.clone();
        let last_result = self.last_result.clone();
        let last_activity = self.last_activity.clone();
        let handle = tokio::spawn(async move {
            let result = agent.lock().await.run(&content).await;
            *state.lock() = match result.stop_reason {
                StopReason::AgentError => SessionState::Error,
                StopReason::Completed => SessionState::Completed,
                StopReason::MaxIterations | StopReason::UserCancelled => SessionState::Idle,
            };
            *last_result.lock() = Some(result);
            *last_activity.lock() = Instant::now();
        });
        *worker = Some(handle);
    }

    /// Wait for the current worker (if any) to finish.
    pub async fn join(&self) {
        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.take() {
            let _ = handle.await;
        }
    }

    /// Interrupt the current generation.
    pub fn cancel(&self) {
        self.interrupt.trigger();
    }

    /// Pending permission requests.
    #[must_use]
    pub fn pending_permissions(&self) -> Vec<PendingPermission> {
        self.permissions.pending()
    }

    /// Answer a permission request; flips the session back to RUNNING when
    /// it was parked.
    pub fn respond_permission(
        &self,
        request_id: &str,
        allowed: bool,
        scope: PermissionScope,
    ) -> bool {
        let ok = self.permissions.respond(request_id, allowed, scope);
        if ok {
            let mut state = self.state.lock();
            if *state == SessionState::WaitingPermission {
                *state = SessionState::Running;
            }
        }
        ok
    }

    /// Snapshot of the conversation.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().clone()
    }

    /// Number of messages in the conversation.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    /// Snapshot of the token counters.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        *self.stats.lock()
    }

    /// The last run's result.
    #[must_use]
    pub fn last_result(&self) -> Option<LoopResult> {
        self.last_result.lock().clone()
    }

    /// Restrict the tools advertised to the model. Intended for freshly
    /// created sessions; a no-op while a worker holds the loop.
    pub fn restrict_tools(&self, allowed: BTreeSet<String>) {
        if let Ok(mut agent) = self.agent.try_lock() {
            agent.restrict_tools(allowed);
        }
    }

    /// Reset the conversation and permission session state.
    pub async fn clear(&self) {
        self.agent.lock().await.clear();
        self.permissions.clear_session();
        *self.last_result.lock() = None;
    }

    /// Time since the session was created.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time since the last activity.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
