//! Session manager: long-lived agent loops keyed by id.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info};

use llagent_core::SessionStats;
use llagent_llm::ModelBackend;
use llagent_permissions::PermissionScope;
use llagent_skills::{AgentsMdManager, SkillsManager};
use llagent_tools::ToolRegistry;

use crate::config::AgentConfig;
use crate::session::{Session, SessionState};

/// Per-session overrides accepted at creation time.
#[derive(Clone, Debug, Default)]
pub struct SessionConfig {
    /// Restrict the tools advertised to the model.
    pub allowed_tools: Option<BTreeSet<String>>,
    /// Skip all permission prompts.
    pub yolo: Option<bool>,
    /// Iteration cap override.
    pub max_iterations: Option<u32>,
    /// Working directory override.
    pub working_dir: Option<PathBuf>,
    /// Skills discovery toggle.
    pub enable_skills: Option<bool>,
    /// Extra skill search paths.
    pub skills_paths: Vec<PathBuf>,
    /// AGENTS.md discovery toggle.
    pub enable_agents_md: Option<bool>,
}

/// Summary of one session.
#[derive(Clone, Debug, Serialize)]
pub struct SessionInfo {
    /// Session id (`sess_` + 8 hex digits).
    pub session_id: String,
    /// Current state.
    pub state: SessionState,
    /// Messages in the conversation.
    pub message_count: usize,
    /// Token counters.
    pub stats: SessionStats,
}

/// The user-level config directory (`~/.llama-agent`).
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".llama-agent"))
}

/// Fill in the prompt sections of a config by running skills and AGENTS.md
/// discovery against its working directory.
pub fn prepare_prompt_sections(config: &mut AgentConfig) {
    if config.enable_agents_md && config.agents_md_prompt_section.is_empty() {
        let mut manager = AgentsMdManager::new();
        let _ = manager.discover(&config.working_dir, config_dir().as_deref());
        config.agents_md_prompt_section = manager.prompt_section();
    }
    if config.enable_skills && config.skills_prompt_section.is_empty() {
        let mut paths = vec![config.working_dir.join("skills")];
        if let Some(dir) = config_dir() {
            paths.push(dir.join("skills"));
        }
        paths.extend(config.skills_paths.iter().cloned());

        let mut manager = SkillsManager::new();
        let _ = manager.discover(&paths);
        config.skills_prompt_section = manager.prompt_section();
    }
}

/// Owns the session map; thread-safe across sessions.
pub struct SessionManager {
    backend: Arc<dyn ModelBackend>,
    registry: Arc<ToolRegistry>,
    defaults: AgentConfig,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    counter: AtomicU64,
}

impl SessionManager {
    /// Manager with per-session defaults.
    #[must_use]
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        defaults: AgentConfig,
    ) -> Self {
        Self {
            backend,
            registry,
            defaults,
            sessions: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> String {
        format!("sess_{:08x}", self.counter.fetch_add(1, Ordering::Relaxed))
    }

    /// The tool registry shared by all sessions.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Create a session, applying overrides to the defaults.
    pub fn create_session(&self, overrides: &SessionConfig) -> String {
        let mut config = self.defaults.clone();
        if let Some(yolo) = overrides.yolo {
            config.yolo = yolo;
        }
        if let Some(max_iterations) = overrides.max_iterations {
            config.max_iterations = max_iterations;
        }
        if let Some(working_dir) = &overrides.working_dir {
            config.working_dir = working_dir.clone();
            // New root means the baked-in sections no longer apply.
            config.agents_md_prompt_section.clear();
            config.skills_prompt_section.clear();
        }
        if let Some(enable_skills) = overrides.enable_skills {
            config.enable_skills = enable_skills;
            if !enable_skills {
                config.skills_prompt_section.clear();
            }
        }
        if let Some(enable_agents_md) = overrides.enable_agents_md {
            config.enable_agents_md = enable_agents_md;
            if !enable_agents_md {
                config.agents_md_prompt_section.clear();
            }
        }
        config.skills_paths.extend(overrides.skills_paths.iter().cloned());
        prepare_prompt_sections(&mut config);

        let id = self.next_id();
        let session = Session::new(
            id.clone(),
            self.backend.clone(),
            self.registry.clone(),
            config,
        );
        if let Some(allowed) = &overrides.allowed_tools {
            session.restrict_tools(allowed.clone());
        }

        let _ = self.sessions.lock().insert(id.clone(), session);
        info!(session_id = %id, "session created");
        id
    }

    /// Look up a session.
    #[must_use]
    pub fn get_session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().get(id).cloned()
    }

    /// Like [`Self::get_session`] but with a typed error for API layers.
    pub fn session(&self, id: &str) -> Result<Arc<Session>, crate::RuntimeError> {
        self.get_session(id)
            .ok_or_else(|| crate::RuntimeError::SessionNotFound(id.to_owned()))
    }

    /// Remove a session; returns whether it existed.
    pub fn delete_session(&self, id: &str) -> bool {
        let removed = self.sessions.lock().remove(id);
        if let Some(session) = &removed {
            session.cancel();
            debug!(session_id = %id, "session deleted");
        }
        removed.is_some()
    }

    /// Summaries of all sessions.
    #[must_use]
    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .sessions
            .lock()
            .values()
            .map(|s| SessionInfo {
                session_id: s.id().to_owned(),
                state: s.state(),
                message_count: s.message_count(),
                stats: s.stats(),
            })
            .collect();
        infos.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        infos
    }

    /// Number of sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Route a permission answer to whichever session owns the request.
    pub fn respond_permission(
        &self,
        request_id: &str,
        allowed: bool,
        scope: PermissionScope,
    ) -> bool {
        let sessions: Vec<Arc<Session>> = self.sessions.lock().values().cloned().collect();
        sessions
            .iter()
            .any(|s| s.respond_permission(request_id, allowed, scope))
    }

    /// Drop settled sessions idle longer than `timeout`.
    pub fn cleanup(&self, timeout: Duration) {
        self.sessions
            .lock()
            .retain(|_, s| !(s.state().is_settled() && s.idle_for() > timeout));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
