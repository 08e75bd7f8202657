//! # Backend Trait
//!
//! Core abstraction over the model inference endpoint. The runtime posts a
//! [`CompletionRequest`] and consumes a stream of [`ModelChunk`]s: zero or
//! more deltas, then exactly one [`FinalCompletion`] carrying the
//! server-parsed message (when available) and timing counters.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use llagent_core::{ChatMessage, ToolSchema};

/// Boxed stream of chunks returned by [`ModelBackend::stream`].
pub type ModelStream = Pin<Box<dyn Stream<Item = Result<ModelChunk, BackendError>> + Send>>;

/// Errors from the model backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SSE stream framing failed.
    #[error("SSE parse error: {message}")]
    SseParse {
        /// Error description.
        message: String,
    },

    /// Endpoint returned an error status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },

    /// Stream was cancelled by the caller.
    #[error("stream cancelled")]
    Cancelled,

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl BackendError {
    /// Error category string for event emission.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) | Self::SseParse { .. } => "parse",
            Self::Api { .. } => "api",
            Self::Cancelled => "cancelled",
            Self::Other { .. } => "unknown",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / response types
// ─────────────────────────────────────────────────────────────────────────────

/// Request posted to the backend.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Tool schemas visible to the model (already filtered for subagents).
    pub tools: Vec<ToolSchema>,
    /// Tool choice policy (always `"auto"` in this runtime).
    pub tool_choice: String,
}

/// A streamed delta: text and/or reasoning content.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamDelta {
    /// Text content delta (empty when absent).
    pub content: String,
    /// Reasoning content delta (empty when absent).
    pub reasoning: String,
}

/// A tool call as parsed by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionToolCall {
    /// Tool call id; may be empty (the loop fabricates one).
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Arguments as a JSON-encoded string.
    pub arguments: String,
}

/// The assembled assistant message from a completed generation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompletionMessage {
    /// Full text content.
    pub content: String,
    /// Parsed tool calls, in model order.
    pub tool_calls: Vec<CompletionToolCall>,
}

/// Timing counters reported by the final frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Timings {
    /// Prompt tokens processed.
    #[serde(default)]
    pub prompt_n: u64,
    /// Prompt evaluation time in milliseconds.
    #[serde(default)]
    pub prompt_ms: f64,
    /// Tokens generated.
    #[serde(default)]
    pub predicted_n: u64,
    /// Generation time in milliseconds.
    #[serde(default)]
    pub predicted_ms: f64,
    /// Tokens served from the prompt cache.
    #[serde(default)]
    pub cache_n: u64,
}

/// Final frame of a generation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FinalCompletion {
    /// Server-parsed message. Preferred when present.
    pub message: Option<CompletionMessage>,
    /// Concatenated content, used when no parsed message is available.
    pub content: String,
    /// Timing counters.
    pub timings: Timings,
}

/// One item of the backend stream.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelChunk {
    /// Incremental content.
    Delta(StreamDelta),
    /// Terminal frame.
    Final(FinalCompletion),
}

// ─────────────────────────────────────────────────────────────────────────────
// Trait
// ─────────────────────────────────────────────────────────────────────────────

/// The model inference facade.
///
/// Implementors must be `Send + Sync`; the loop holds one behind an `Arc`
/// and shares it with subagents.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Model identifier for display.
    fn model(&self) -> &str;

    /// Post a request and stream the response.
    async fn stream(&self, request: &CompletionRequest) -> Result<ModelStream, BackendError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
