//! Command-line flags.

use std::path::PathBuf;

use clap::Parser;

/// Local AI coding assistant over a llama-server endpoint.
#[derive(Debug, Parser)]
#[command(name = "llagent", version, about)]
pub struct Args {
    /// Base URL of the llama-server inference endpoint.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    pub server: String,

    /// Working directory (default: current directory).
    #[arg(long)]
    pub working_dir: Option<PathBuf>,

    /// Auto-approve every permission check.
    #[arg(long)]
    pub yolo: bool,

    /// Iteration cap per message (clamped to 1..=1000).
    #[arg(long, short = 'm', default_value_t = 50)]
    pub max_iterations: u32,

    /// Enable subagents (default).
    #[arg(long, overrides_with = "no_subagents")]
    pub subagents: bool,

    /// Disable subagents.
    #[arg(long)]
    pub no_subagents: bool,

    /// Maximum subagent nesting depth (clamped to 0..=5).
    #[arg(long, default_value_t = 1)]
    pub max_subagent_depth: u32,

    /// Disable skills discovery.
    #[arg(long)]
    pub no_skills: bool,

    /// Disable AGENTS.md discovery.
    #[arg(long)]
    pub no_agents_md: bool,

    /// Extra skill search path (repeatable).
    #[arg(long = "skills-path")]
    pub skills_paths: Vec<PathBuf>,

    /// Verbose iteration logging.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Args {
    /// Iteration cap with the documented clamp applied.
    #[must_use]
    pub fn clamped_max_iterations(&self) -> u32 {
        self.max_iterations.clamp(1, 1000)
    }

    /// Depth cap with the documented clamp applied.
    #[must_use]
    pub fn clamped_max_subagent_depth(&self) -> u32 {
        self.max_subagent_depth.min(5)
    }

    /// Whether subagents are enabled after flag resolution.
    #[must_use]
    pub fn subagents_enabled(&self) -> bool {
        !self.no_subagents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["llagent"]);
        assert_eq!(args.server, "http://127.0.0.1:8080");
        assert!(!args.yolo);
        assert_eq!(args.clamped_max_iterations(), 50);
        assert!(args.subagents_enabled());
        assert_eq!(args.clamped_max_subagent_depth(), 1);
    }

    #[test]
    fn max_iterations_clamped() {
        let args = Args::parse_from(["llagent", "--max-iterations", "0"]);
        assert_eq!(args.clamped_max_iterations(), 1);
        let args = Args::parse_from(["llagent", "--max-iterations", "5000"]);
        assert_eq!(args.clamped_max_iterations(), 1000);
    }

    #[test]
    fn depth_clamped() {
        let args = Args::parse_from(["llagent", "--max-subagent-depth", "9"]);
        assert_eq!(args.clamped_max_subagent_depth(), 5);
    }

    #[test]
    fn no_subagents_flag() {
        let args = Args::parse_from(["llagent", "--no-subagents"]);
        assert!(!args.subagents_enabled());
    }

    #[test]
    fn skills_path_repeats() {
        let args = Args::parse_from([
            "llagent",
            "--skills-path",
            "/a",
            "--skills-path",
            "/b",
        ]);
        assert_eq!(args.skills_paths.len(), 2);
    }
}
