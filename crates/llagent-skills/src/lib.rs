//! Prompt-time document discovery: skills (agentskills.io SKILL.md) and
//! AGENTS.md project guidance.
//!
//! Both produce XML prompt sections appended to the root system prompt.
//! Nothing here affects the loop's behavior at runtime; failures degrade to
//! empty sections.

pub mod agents_md;
pub mod skills;
pub mod xml;

pub use agents_md::{AgentsMdFile, AgentsMdManager};
pub use skills::{SkillMetadata, SkillsManager};
