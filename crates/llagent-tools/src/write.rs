//! `write` tool — create or overwrite a file.

use async_trait::async_trait;
use serde_json::{json, Value};

use llagent_core::{ToolResult, ToolSchema};
use llagent_permissions::is_sensitive_file;

use crate::traits::{AgentTool, ToolContext, ToolError};
use crate::util::{optional_str, required_str, resolve_path};

/// The `write` tool.
pub struct WriteTool;

#[async_trait]
impl AgentTool for WriteTool {
    fn name(&self) -> &str {
        "write"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "write".into(),
            description: "Create a new file or overwrite an existing file with the given content.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file to write (absolute or relative to working directory)"
                    },
                    "content": {
                        "type": "string",
                        "description": "The content to write to the file"
                    }
                },
                "required": ["file_path", "content"]
            }),
        }
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let file_path = match required_str(&args, "file_path") {
            Ok(p) => p,
            Err(failure) => return Ok(failure),
        };
        let content = optional_str(&args, "content");

        let path = resolve_path(&file_path, &ctx.working_dir);

        if is_sensitive_file(&path) {
            return Ok(ToolResult::fail(format!(
                "Cannot write to sensitive file (contains credentials/secrets): {}",
                path.display()
            )));
        }

        let existed = tokio::fs::try_exists(&path).await.unwrap_or(false);

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                return Ok(ToolResult::fail(format!(
                    "Failed to create directories: {e}"
                )));
            }
        }

        if let Err(e) = tokio::fs::write(&path, &content).await {
            return Ok(ToolResult::fail(format!(
                "Error writing to file: {} ({e})",
                path.display()
            )));
        }

        let verb = if existed { "File updated" } else { "File created" };
        Ok(ToolResult::ok(format!(
            "{verb}: {} ({} bytes)",
            path.display(),
            content.len()
        )))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
