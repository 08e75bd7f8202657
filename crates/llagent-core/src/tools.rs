//! Tool schema and result types.
//!
//! A [`ToolSchema`] is what the model sees; a [`ToolResult`] is what tool
//! execution produces. Failures are values, not errors: a failed result
//! carries a non-empty `output` and/or `error` and the loop keeps going.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool definition sent to the model in OpenAI-compatible schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name (unique within the registry).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the parameters object.
    pub parameters: Value,
}

impl ToolSchema {
    /// Wrap in the OpenAI `{"type":"function","function":{...}}` envelope.
    #[must_use]
    pub fn to_openai(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// Result of executing a tool.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool succeeded.
    pub success: bool,
    /// Tool output (may be partial on failure, e.g. bash stderr).
    pub output: String,
    /// Error message when `success` is false.
    pub error: String,
}

impl ToolResult {
    /// Successful result with output.
    #[must_use]
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: String::new(),
        }
    }

    /// Failed result with an error message and no output.
    #[must_use]
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: error.into(),
        }
    }

    /// Failed result that still carries partial output.
    #[must_use]
    pub fn fail_with_output(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            error: error.into(),
        }
    }

    /// Render the content string appended to the conversation as the tool
    /// message. Failures fold output and error together.
    #[must_use]
    pub fn to_message_content(&self) -> String {
        if self.success {
            return self.output.clone();
        }
        match (self.output.is_empty(), self.error.is_empty()) {
            (false, false) => format!("{}\nError: {}", self.output, self.error),
            (false, true) => self.output.clone(),
            (true, false) => format!("Error: {}", self.error),
            (true, true) => "Error: Tool failed with no output".into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
