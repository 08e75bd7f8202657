//! Core types shared across the llagent workspace.
//!
//! This crate is data-only: the OpenAI-compatible conversation model, tool
//! schema and result types, the streaming event channel variants, and the
//! session statistics counters. No I/O, no async, no errors to propagate.

pub mod events;
pub mod messages;
pub mod stats;
pub mod tools;

pub use events::{AgentEvent, StopReason};
pub use messages::{AssistantToolCall, ChatMessage, Role, ToolCallFunction};
pub use stats::SessionStats;
pub use tools::{ToolResult, ToolSchema};
