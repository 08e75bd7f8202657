//! Registry adapter exposing one MCP server tool as an [`AgentTool`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use llagent_core::{ToolResult, ToolSchema};
use llagent_tools::{AgentTool, ToolContext, ToolError};

use crate::client::McpClient;
use crate::protocol::{flatten_content, McpToolDef};

/// An MCP server tool registered under its qualified name.
pub struct McpTool {
    qualified_name: String,
    definition: McpToolDef,
    client: Arc<McpClient>,
    timeout_ms: u64,
}

impl McpTool {
    /// Wrap a server tool definition.
    #[must_use]
    pub fn new(
        qualified_name: String,
        definition: McpToolDef,
        client: Arc<McpClient>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            qualified_name,
            definition,
            client,
            timeout_ms,
        }
    }
}

#[async_trait]
impl AgentTool for McpTool {
    fn name(&self) -> &str {
        &self.qualified_name
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.qualified_name.clone(),
            description: if self.definition.description.is_empty() {
                format!("MCP tool {} (server {})", self.definition.name, self.client.name())
            } else {
                self.definition.description.clone()
            },
            parameters: self.definition.input_schema.clone(),
        }
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        match self
            .client
            .call_tool(&self.definition.name, args, self.timeout_ms)
            .await
        {
            Ok(reply) => {
                let text = flatten_content(&reply.content);
                if reply.is_error {
                    Ok(ToolResult::fail(if text.is_empty() {
                        format!("MCP tool {} failed", self.definition.name)
                    } else {
                        text
                    }))
                } else {
                    Ok(ToolResult::ok(text))
                }
            }
            Err(e) => Ok(ToolResult::fail(format!(
                "MCP call failed: {e}"
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
