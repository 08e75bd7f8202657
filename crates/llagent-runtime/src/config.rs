//! Agent configuration.

use std::path::PathBuf;

/// Configuration for one agent loop (root or subagent).
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Iteration cap for the loop.
    pub max_iterations: u32,
    /// Default per-tool timeout budget in milliseconds.
    pub tool_timeout_ms: u64,
    /// Working directory for tools and path policy.
    pub working_dir: PathBuf,
    /// Verbose iteration logging.
    pub verbose: bool,
    /// Skip all permission prompts.
    pub yolo: bool,
    /// Whether the `task` tool may spawn subagents.
    pub enable_subagents: bool,
    /// Maximum subagent nesting depth.
    pub max_subagent_depth: u32,
    /// Whether skills are discovered and injected into the prompt.
    pub enable_skills: bool,
    /// Extra skill search paths.
    pub skills_paths: Vec<PathBuf>,
    /// Pre-generated skills prompt section.
    pub skills_prompt_section: String,
    /// Whether AGENTS.md files are discovered and injected.
    pub enable_agents_md: bool,
    /// Pre-generated AGENTS.md prompt section.
    pub agents_md_prompt_section: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tool_timeout_ms: 120_000,
            working_dir: PathBuf::from("."),
            verbose: false,
            yolo: false,
            enable_subagents: true,
            max_subagent_depth: 1,
            enable_skills: true,
            skills_paths: Vec::new(),
            skills_prompt_section: String::new(),
            enable_agents_md: true,
            agents_md_prompt_section: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = AgentConfig::default();
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.tool_timeout_ms, 120_000);
        assert!(!config.yolo);
        assert!(config.enable_subagents);
        assert_eq!(config.max_subagent_depth, 1);
    }
}
