//! Core tool trait and execution context.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use llagent_core::{ToolResult, ToolSchema};

use crate::subagent::SubagentSpawner;

/// Errors a tool may surface instead of building a failure result itself.
///
/// The registry adapts these into `{success:false, error:"Tool execution
/// error: …"}` results, so nothing propagates past the dispatch boundary.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Parameter validation failed.
    #[error("validation error: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// Generic I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (catch-all).
    #[error("{message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

/// Execution context passed to every tool invocation.
///
/// Carries only borrowed handles: the interrupt token is shared down the
/// subagent chain, and `spawner` is a non-owning reference to the runner
/// used exclusively by the `task` tool.
#[derive(Clone)]
pub struct ToolContext {
    /// Working directory for path resolution and child processes.
    pub working_dir: PathBuf,
    /// Shared interrupt flag.
    pub cancellation: CancellationToken,
    /// Default tool timeout budget in milliseconds.
    pub timeout_ms: u64,
    /// Current subagent nesting depth (0 = root agent).
    pub subagent_depth: u32,
    /// Subagent runner handle, present when subagents are enabled.
    pub spawner: Option<Arc<dyn SubagentSpawner>>,
}

impl ToolContext {
    /// Context with no subagent support at depth 0.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>, timeout_ms: u64) -> Self {
        Self {
            working_dir: working_dir.into(),
            cancellation: CancellationToken::new(),
            timeout_ms,
            subagent_depth: 0,
            spawner: None,
        }
    }
}

/// The trait every tool implements.
#[async_trait]
pub trait AgentTool: Send + Sync {
    /// Tool name — the exact string sent to/from the model.
    fn name(&self) -> &str;

    /// JSON-schema definition sent to the model.
    fn schema(&self) -> ToolSchema;

    /// Execute with JSON arguments. Expected failures are returned as
    /// failed [`ToolResult`]s; `Err` is reserved for conditions the
    /// registry converts into a generic execution-error result.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_construction() {
        let ctx = ToolContext::new("/tmp", 120_000);
        assert_eq!(ctx.working_dir, PathBuf::from("/tmp"));
        assert_eq!(ctx.timeout_ms, 120_000);
        assert_eq!(ctx.subagent_depth, 0);
        assert!(ctx.spawner.is_none());
        assert!(!ctx.cancellation.is_cancelled());
    }

    #[test]
    fn tool_error_display() {
        let err = ToolError::Validation {
            message: "missing field".into(),
        };
        assert_eq!(err.to_string(), "validation error: missing field");

        let err = ToolError::Internal {
            message: "subagent context not initialized".into(),
        };
        assert_eq!(err.to_string(), "subagent context not initialized");
    }

    #[test]
    fn agent_tool_is_object_safe() {
        fn assert_object_safe(_: &dyn AgentTool) {}
        let _ = assert_object_safe;
    }
}
