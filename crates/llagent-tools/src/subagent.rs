//! Subagent types and the spawner seam used by the `task` tool.
//!
//! The four fixed subagent types carry their own tool whitelist, bash
//! prefix allow-list (EXPLORE only), and iteration cap. The runner itself
//! lives in the runtime crate and is reached through [`SubagentSpawner`].

use async_trait::async_trait;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// The four subagent flavors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubagentType {
    /// Read-only exploration: `read`, `glob`, prefix-filtered `bash`.
    Explore,
    /// Planning: `read`, `glob`.
    Plan,
    /// General task execution: all tools except `task`.
    General,
    /// Shell-only.
    Bash,
}

/// Static configuration of one subagent type.
#[derive(Debug)]
pub struct SubagentTypeConfig {
    /// Wire name (`explore`, `plan`, `general`, `bash`).
    pub name: &'static str,
    /// One-line description used in prompts and output.
    pub description: &'static str,
    /// Tool whitelist.
    pub allowed_tools: &'static [&'static str],
    /// Allowed bash command prefixes (EXPLORE only; empty = unrestricted).
    pub bash_prefixes: &'static [&'static str],
    /// Whether the type may modify files through tools.
    pub can_write_files: bool,
    /// Iteration cap for the nested loop.
    pub max_iterations: u32,
}

const EXPLORE_CONFIG: SubagentTypeConfig = SubagentTypeConfig {
    name: "explore",
    description: "Read-only exploration of codebase",
    allowed_tools: &["read", "glob", "bash"],
    bash_prefixes: &[
        "ls",
        "cat ",
        "head ",
        "tail ",
        "grep ",
        "find ",
        "file ",
        "wc ",
        "git status",
        "git log",
        "git diff",
        "git branch",
        "git show",
        "tree",
        "which ",
        "type ",
        "pwd",
    ],
    can_write_files: false,
    max_iterations: 20,
};

const PLAN_CONFIG: SubagentTypeConfig = SubagentTypeConfig {
    name: "plan",
    description: "Architecture and design planning",
    allowed_tools: &["read", "glob"],
    bash_prefixes: &[],
    can_write_files: false,
    max_iterations: 15,
};

const GENERAL_CONFIG: SubagentTypeConfig = SubagentTypeConfig {
    name: "general",
    description: "General-purpose task execution",
    allowed_tools: &["read", "write", "edit", "glob", "bash"],
    bash_prefixes: &[],
    can_write_files: true,
    max_iterations: 30,
};

const BASH_CONFIG: SubagentTypeConfig = SubagentTypeConfig {
    name: "bash",
    description: "Shell command execution",
    allowed_tools: &["bash"],
    bash_prefixes: &[],
    can_write_files: false,
    max_iterations: 10,
};

impl SubagentType {
    /// Parse a wire name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "explore" => Some(Self::Explore),
            "plan" => Some(Self::Plan),
            "general" => Some(Self::General),
            "bash" => Some(Self::Bash),
            _ => None,
        }
    }

    /// The type's static configuration.
    #[must_use]
    pub fn config(self) -> &'static SubagentTypeConfig {
        match self {
            Self::Explore => &EXPLORE_CONFIG,
            Self::Plan => &PLAN_CONFIG,
            Self::General => &GENERAL_CONFIG,
            Self::Bash => &BASH_CONFIG,
        }
    }

    /// The wire name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.config().name
    }
}

/// Parameters for one subagent run.
#[derive(Clone, Debug)]
pub struct SubagentParams {
    /// Which flavor to run.
    pub subagent_type: SubagentType,
    /// The task given to the nested loop.
    pub prompt: String,
    /// Short display description.
    pub description: String,
}

/// Result of a completed subagent run.
#[derive(Clone, Debug, Default)]
pub struct SubagentOutcome {
    /// Whether the nested loop stopped with COMPLETED.
    pub success: bool,
    /// The child's final response.
    pub output: String,
    /// Error description when not successful.
    pub error: String,
    /// Iterations consumed.
    pub iterations: u32,
    /// One summary line per tool call (`name (Nms)`).
    pub tool_calls: Vec<String>,
    /// Prompt tokens used by the child.
    pub input_tokens: u64,
    /// Output tokens used by the child.
    pub output_tokens: u64,
    /// Cached tokens used by the child.
    pub cached_tokens: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Spawner seam
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to the subagent runner, carried (non-owning) in the tool context.
#[async_trait]
pub trait SubagentSpawner: Send + Sync {
    /// Whether a child may be spawned from `current_depth`.
    fn can_spawn(&self, current_depth: u32) -> bool;

    /// The configured maximum nesting depth.
    fn max_depth(&self) -> u32;

    /// Run a subagent to completion.
    async fn run(&self, params: SubagentParams, current_depth: u32) -> SubagentOutcome;

    /// Start a background task; returns its `task-…` id.
    async fn start_background(&self, params: SubagentParams, current_depth: u32) -> String;

    /// Whether a background task has finished.
    fn is_complete(&self, task_id: &str) -> bool;

    /// Take the finalized result of a completed task. Consumes it: a second
    /// call returns `None`.
    async fn take_result(&self, task_id: &str) -> Option<SubagentOutcome>;

    /// Ids of tasks still running.
    fn active_tasks(&self) -> Vec<String>;

    /// Request cancellation of a background task (best-effort).
    fn cancel(&self, task_id: &str) -> bool;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_names() {
        for name in ["explore", "plan", "general", "bash"] {
            let t = SubagentType::parse(name).expect(name);
            assert_eq!(t.name(), name);
        }
        assert!(SubagentType::parse("wizard").is_none());
    }

    #[test]
    fn iteration_caps() {
        assert_eq!(SubagentType::Explore.config().max_iterations, 20);
        assert_eq!(SubagentType::Plan.config().max_iterations, 15);
        assert_eq!(SubagentType::General.config().max_iterations, 30);
        assert_eq!(SubagentType::Bash.config().max_iterations, 10);
    }

    #[test]
    fn explore_is_the_only_type_with_bash_prefixes() {
        assert!(!SubagentType::Explore.config().bash_prefixes.is_empty());
        assert!(SubagentType::Plan.config().bash_prefixes.is_empty());
        assert!(SubagentType::General.config().bash_prefixes.is_empty());
        assert!(SubagentType::Bash.config().bash_prefixes.is_empty());
    }

    #[test]
    fn task_is_never_whitelisted() {
        for t in [
            SubagentType::Explore,
            SubagentType::Plan,
            SubagentType::General,
            SubagentType::Bash,
        ] {
            assert!(!t.config().allowed_tools.contains(&"task"), "{t:?}");
        }
    }

    #[test]
    fn only_general_can_write_files() {
        assert!(SubagentType::General.config().can_write_files);
        assert!(!SubagentType::Explore.config().can_write_files);
        assert!(!SubagentType::Plan.config().can_write_files);
        assert!(!SubagentType::Bash.config().can_write_files);
    }
}
