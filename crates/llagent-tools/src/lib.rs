//! Tool system: the [`AgentTool`] trait, the registry, and the built-in
//! tools (`bash`, `read`, `write`, `edit`, `glob`, `task`).
//!
//! Tools never panic outward: parameter problems and execution failures are
//! returned as [`llagent_core::ToolResult`] values so the agent loop can
//! keep going. The `task` tool reaches the subagent runner only through the
//! [`SubagentSpawner`] handle carried in [`ToolContext`] — no ownership
//! flows through the registry.

pub mod bash;
pub mod edit;
pub mod glob;
pub mod read;
pub mod registry;
pub mod subagent;
pub mod task;
pub mod traits;
pub mod util;
pub mod write;

pub use registry::ToolRegistry;
pub use subagent::{
    SubagentOutcome, SubagentParams, SubagentSpawner, SubagentType, SubagentTypeConfig,
};
pub use traits::{AgentTool, ToolContext, ToolError};

use std::sync::Arc;

/// Register the five filesystem/shell tools plus `task`.
pub fn register_builtin_tools(registry: &mut ToolRegistry) {
    registry.register(Arc::new(bash::BashTool));
    registry.register(Arc::new(read::ReadTool));
    registry.register(Arc::new(write::WriteTool));
    registry.register(Arc::new(edit::EditTool));
    registry.register(Arc::new(glob::GlobTool));
    registry.register(Arc::new(task::TaskTool));
}
