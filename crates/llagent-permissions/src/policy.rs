//! The pure decision core.
//!
//! Holds the per-type defaults, session overrides, bash pattern lists, and
//! the recent-call tail for doom-loop detection. Drivers (TTY, async API)
//! share one engine behind [`SharedPolicy`] and write session-scoped answers
//! back into it.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::paths;
use crate::types::{PermissionRequest, PermissionState, PermissionType};

/// A policy engine shared between the loop and its ASK drivers.
pub type SharedPolicy = Arc<Mutex<PolicyEngine>>;

/// Dangerous bash substrings: their presence anywhere in a command forces an
/// ASK (and flags the request as dangerous).
pub const DANGEROUS_BASH_PATTERNS: &[&str] = &[
    // Destructive commands
    "rm -rf",
    "rm -r /",
    "rm -f",
    "rmdir",
    // Privilege escalation
    "sudo ",
    "su -",
    "doas ",
    // Dangerous permissions
    "chmod 777",
    "chmod -R",
    "chown -R",
    // Remote code execution
    "curl | sh",
    "curl | bash",
    "wget | sh",
    "wget | bash",
    "curl -s | sh",
    "wget -O - |",
    // System damage
    "> /dev/",
    "dd if=",
    "mkfs.",
    ":(){:|:&};:",
    // Package managers (can modify system)
    "pip install",
    "pip3 install",
    "npm i -g",
    "npm install -g",
    "brew install",
    "apt install",
    "apt-get install",
    "yum install",
    // Git destructive
    "git push -f",
    "git push --force",
    "git reset --hard",
    // Process control
    "kill -9",
    "killall",
    "pkill",
];

/// Safe bash prefixes: commands starting with one of these auto-allow.
pub const SAFE_BASH_PREFIXES: &[&str] = &[
    "ls",
    "pwd",
    "cat ",
    "head ",
    "tail ",
    "grep ",
    "find ",
    "wc ",
    "diff ",
    "git status",
    "git log",
    "git diff",
    "git branch",
    "echo ",
    "which ",
    "type ",
    "file ",
];

const DOOM_LOOP_THRESHOLD: u32 = 3;
const RECENT_CALL_CAP: usize = 10;

/// One entry of the recent-call tail.
#[derive(Clone, Debug, PartialEq, Eq)]
struct CallRecord {
    tool: String,
    args_hash: String,
    count: u32,
}

/// Hash a tool's raw argument string for doom-loop bookkeeping.
#[must_use]
pub fn args_hash(arguments: &str) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    arguments.hash(&mut hasher);
    hasher.finish().to_string()
}

/// The permission decision core.
#[derive(Debug, Default)]
pub struct PolicyEngine {
    project_root: PathBuf,
    yolo: bool,
    session_overrides: HashMap<String, PermissionState>,
    recent_calls: Vec<CallRecord>,
}

impl PolicyEngine {
    /// Create an engine rooted at `project_root`.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>, yolo: bool) -> Self {
        Self {
            project_root: paths::normalize(&project_root.into()),
            yolo,
            session_overrides: HashMap::new(),
            recent_calls: Vec::new(),
        }
    }

    /// Wrap into the shared handle used by drivers.
    #[must_use]
    pub fn into_shared(self) -> SharedPolicy {
        Arc::new(Mutex::new(self))
    }

    /// The normalized project root.
    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Whether yolo mode is on.
    #[must_use]
    pub fn yolo(&self) -> bool {
        self.yolo
    }

    fn default_for(permission_type: PermissionType) -> PermissionState {
        match permission_type {
            PermissionType::FileRead | PermissionType::Glob => PermissionState::Allow,
            PermissionType::Bash
            | PermissionType::FileWrite
            | PermissionType::FileEdit
            | PermissionType::ExternalDir => PermissionState::Ask,
        }
    }

    /// Whether a command contains any dangerous substring.
    #[must_use]
    pub fn is_dangerous_command(command: &str) -> bool {
        DANGEROUS_BASH_PATTERNS.iter().any(|p| command.contains(p))
    }

    fn matches_safe_prefix(command: &str) -> bool {
        SAFE_BASH_PREFIXES
            .iter()
            .any(|p| command.starts_with(p) || command.contains(&format!(" {p}")))
    }

    /// Decide the state for a request.
    ///
    /// Order: yolo, session override, bash pattern lists, per-type default.
    #[must_use]
    pub fn check_permission(&self, request: &PermissionRequest) -> PermissionState {
        if self.yolo {
            return PermissionState::Allow;
        }

        if let Some(state) = self.session_overrides.get(&request.session_key()) {
            return *state;
        }

        if request.permission_type == PermissionType::Bash {
            if Self::is_dangerous_command(&request.details) {
                return PermissionState::Ask;
            }
            if Self::matches_safe_prefix(&request.details) {
                return PermissionState::Allow;
            }
        }

        Self::default_for(request.permission_type)
    }

    /// Record a session-scoped override for a request key.
    pub fn set_session_override(&mut self, key: String, state: PermissionState) {
        debug!(key, ?state, "session override recorded");
        let _ = self.session_overrides.insert(key, state);
    }

    /// Record a dispatched tool call in the recent tail.
    pub fn record_tool_call(&mut self, tool: &str, args_hash: &str) {
        if let Some(last) = self.recent_calls.last_mut() {
            if last.tool == tool && last.args_hash == args_hash {
                last.count += 1;
                return;
            }
        }
        self.recent_calls.push(CallRecord {
            tool: tool.to_owned(),
            args_hash: args_hash.to_owned(),
            count: 1,
        });
        if self.recent_calls.len() > RECENT_CALL_CAP {
            let _ = self.recent_calls.remove(0);
        }
    }

    /// Whether this call would be the third-or-later identical dispatch in a
    /// row. The dispatch being checked counts toward the threshold; it has
    /// not been recorded yet.
    #[must_use]
    pub fn is_doom_loop(&self, tool: &str, args_hash: &str) -> bool {
        self.recent_calls.last().is_some_and(|last| {
            last.tool == tool && last.args_hash == args_hash && last.count + 1 >= DOOM_LOOP_THRESHOLD
        })
    }

    /// Whether `path` is outside the project root.
    #[must_use]
    pub fn is_external_path(&self, path: &Path) -> bool {
        if self.project_root.as_os_str().is_empty() {
            return false;
        }
        !paths::is_within(path, &self.project_root)
    }

    /// Drop session overrides and the recent-call tail.
    pub fn clear_session(&mut self) {
        self.session_overrides.clear();
        self.recent_calls.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
