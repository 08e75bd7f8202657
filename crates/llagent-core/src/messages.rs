//! Conversation message types in OpenAI-compatible wire format.
//!
//! The conversation is an append-only sequence of [`ChatMessage`]s. The
//! system message sits at position 0 and survives `clear`. Assistant
//! messages may carry tool calls; tool messages reference them back via
//! `tool_call_id`.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

/// Message role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt (position 0, preserved across `clear`).
    System,
    /// User turn.
    User,
    /// Model turn, possibly carrying tool calls.
    Assistant,
    /// Tool output, referencing a prior assistant tool call.
    Tool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool calls
// ─────────────────────────────────────────────────────────────────────────────

/// The `function` object inside an assistant tool call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFunction {
    /// Tool name.
    pub name: String,
    /// Arguments as a JSON-encoded string (OpenAI convention).
    pub arguments: String,
}

/// A tool call recorded on an assistant message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssistantToolCall {
    /// Tool call id referenced back by the matching tool message.
    pub id: String,
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub call_type: String,
    /// Name and JSON-string arguments.
    pub function: ToolCallFunction,
}

impl AssistantToolCall {
    /// Build a `function`-typed tool call.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            call_type: "function".into(),
            function: ToolCallFunction {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// A single conversation message in OpenAI-compatible shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: Role,
    /// Text content (empty string allowed for assistant tool-call turns).
    pub content: String,
    /// Tool calls (assistant messages only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<AssistantToolCall>>,
    /// Back-reference to the originating tool call (tool messages only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name (tool messages only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    /// System message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    /// User message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    /// Assistant message without tool calls.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }

    /// Assistant message carrying tool calls.
    #[must_use]
    pub fn assistant_with_calls(
        content: impl Into<String>,
        tool_calls: Vec<AssistantToolCall>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(tool_calls)
            },
            tool_call_id: None,
            name: None,
        }
    }

    /// Tool result message referencing `tool_call_id`.
    #[must_use]
    pub fn tool(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
        }
    }
}

/// Check that every tool message references a tool call id that appears on
/// some earlier assistant message.
#[must_use]
pub fn is_well_formed(messages: &[ChatMessage]) -> bool {
    let mut seen_ids: Vec<&str> = Vec::new();
    for msg in messages {
        match msg.role {
            Role::Assistant => {
                if let Some(calls) = &msg.tool_calls {
                    seen_ids.extend(calls.iter().map(|c| c.id.as_str()));
                }
            }
            Role::Tool => {
                let Some(id) = msg.tool_call_id.as_deref() else {
                    return false;
                };
                if !seen_ids.contains(&id) {
                    return false;
                }
            }
            Role::System | Role::User => {}
        }
    }
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
