//! JSON-RPC 2.0 message shapes for the MCP stdio protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision sent in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Outgoing request.
#[derive(Clone, Debug, Serialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Request id for correlation.
    pub id: i64,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request.
    #[must_use]
    pub fn new(id: i64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: method.into(),
            params,
        }
    }
}

/// Outgoing notification (no id, no reply expected).
#[derive(Clone, Debug, Serialize)]
pub struct JsonRpcNotification {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Error object in a response.
#[derive(Clone, Debug, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
}

/// Incoming response (or server-initiated message, which carries no id).
#[derive(Clone, Debug, Deserialize)]
pub struct JsonRpcResponse {
    /// Correlation id; absent on notifications.
    pub id: Option<i64>,
    /// Success payload.
    pub result: Option<Value>,
    /// Error payload.
    pub error: Option<JsonRpcError>,
}

/// A tool definition from `tools/list`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct McpToolDef {
    /// Tool name as the server knows it.
    pub name: String,
    /// Description (may be absent).
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the parameters.
    #[serde(default = "empty_object", rename = "inputSchema")]
    pub input_schema: Value,
}

fn empty_object() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

/// Result payload of `tools/list`.
#[derive(Clone, Debug, Deserialize)]
pub struct ToolsListResult {
    /// The server's tools.
    #[serde(default)]
    pub tools: Vec<McpToolDef>,
}

/// Result payload of `tools/call`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallToolResult {
    /// Content blocks.
    #[serde(default)]
    pub content: Vec<Value>,
    /// Whether the call failed server-side.
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

/// Concatenate the text of a reply's content blocks, joined by newlines.
#[must_use]
pub fn flatten_content(content: &[Value]) -> String {
    content
        .iter()
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
