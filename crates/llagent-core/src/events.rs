//! Streaming event channel variants.
//!
//! The agent loop emits one [`AgentEvent`] per observable step. Consumers
//! (terminal renderer, SSE pump) subscribe and adapt; the emitter never
//! blocks on a consumer. Within one iteration events are strictly ordered:
//! optional `IterationStart`, interleaved deltas, then `(ToolStart →
//! ToolResult)` pairs. `Completed` and `Error` are terminal.

use serde::{Deserialize, Serialize};

use crate::stats::SessionStats;

/// Why the agent loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Model finished without tool calls.
    Completed,
    /// Hit the iteration limit.
    MaxIterations,
    /// User interrupted.
    UserCancelled,
    /// Model stream or internal error.
    #[serde(rename = "error")]
    AgentError,
}

/// One observable step of the agent loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Streaming model text.
    TextDelta {
        /// Delta content.
        content: String,
    },
    /// Streaming reasoning/thinking content.
    ReasoningDelta {
        /// Delta content.
        content: String,
    },
    /// Tool execution starting.
    ToolStart {
        /// Tool name.
        name: String,
        /// Raw JSON arguments string.
        args: String,
    },
    /// Tool execution finished.
    ToolResult {
        /// Tool name.
        name: String,
        /// Whether the tool succeeded.
        success: bool,
        /// Truncated output for display.
        output: String,
        /// Elapsed wall-clock time.
        duration_ms: u64,
    },
    /// Waiting on a permission decision.
    PermissionRequired {
        /// Async request id (`perm_…`).
        request_id: String,
        /// Tool being gated.
        tool: String,
        /// Command / path details.
        details: String,
        /// Whether the request matched a dangerous pattern.
        dangerous: bool,
    },
    /// A permission request was answered.
    PermissionResolved {
        /// Async request id.
        request_id: String,
        /// Whether the request was allowed.
        allowed: bool,
    },
    /// A new loop iteration is starting.
    IterationStart {
        /// 1-based iteration number.
        iteration: u32,
        /// Configured cap.
        max_iterations: u32,
    },
    /// Terminal: the loop finished.
    Completed {
        /// Stop reason.
        reason: StopReason,
        /// Accumulated token counters.
        stats: SessionStats,
    },
    /// Terminal: the loop failed.
    Error {
        /// Error description.
        message: String,
    },
}

impl AgentEvent {
    /// SSE event name (snake_case).
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::TextDelta { .. } => "text_delta",
            Self::ReasoningDelta { .. } => "reasoning_delta",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolResult { .. } => "tool_result",
            Self::PermissionRequired { .. } => "permission_required",
            Self::PermissionResolved { .. } => "permission_resolved",
            Self::IterationStart { .. } => "iteration_start",
            Self::Completed { .. } => "completed",
            Self::Error { .. } => "error",
        }
    }

    /// Whether no further events follow this one.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Error { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
