//! `edit` tool — targeted search/replace in a file.
//!
//! `old_string` must match exactly. Multiple occurrences without
//! `replace_all` fail with the count and a remediation hint, leaving the
//! file untouched.

use async_trait::async_trait;
use serde_json::{json, Value};

use llagent_core::{ToolResult, ToolSchema};

use crate::traits::{AgentTool, ToolContext, ToolError};
use crate::util::{optional_bool, optional_str, required_str, resolve_path};

/// The `edit` tool.
pub struct EditTool;

#[async_trait]
impl AgentTool for EditTool {
    fn name(&self) -> &str {
        "edit"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "edit".into(),
            description: "Make targeted edits to a file by finding and replacing specific text. The old_string must match exactly (including whitespace and indentation). For multiple matches, either provide more context or use replace_all.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file to edit (absolute or relative to working directory)"
                    },
                    "old_string": {
                        "type": "string",
                        "description": "The exact text to find and replace. Include enough context (surrounding lines) to uniquely identify the location."
                    },
                    "new_string": {
                        "type": "string",
                        "description": "The text to replace old_string with"
                    },
                    "replace_all": {
                        "type": "boolean",
                        "description": "If true, replace all occurrences. Default is false (single replacement)."
                    }
                },
                "required": ["file_path", "old_string", "new_string"]
            }),
        }
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let file_path = match required_str(&args, "file_path") {
            Ok(p) => p,
            Err(failure) => return Ok(failure),
        };
        let old_string = match required_str(&args, "old_string") {
            Ok(s) => s,
            Err(failure) => return Ok(failure),
        };
        let new_string = optional_str(&args, "new_string");
        let replace_all = optional_bool(&args, "replace_all");

        if old_string == new_string {
            return Ok(ToolResult::fail(
                "old_string and new_string must be different",
            ));
        }

        let path = resolve_path(&file_path, &ctx.working_dir);

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(ToolResult::fail(format!("File not found: {}", path.display())));
        }

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                return Ok(ToolResult::fail(format!(
                    "Cannot read file: {} ({e})",
                    path.display()
                )))
            }
        };

        let count = content.matches(&old_string).count();
        if count == 0 {
            return Ok(ToolResult::fail(
                "old_string not found in file. Make sure you're using the exact text including whitespace and indentation.",
            ));
        }
        if count > 1 && !replace_all {
            return Ok(ToolResult::fail(format!(
                "Found {count} occurrences of old_string. Provide more context to make it unique, or set replace_all=true to replace all occurrences."
            )));
        }

        let (new_content, replacements) = if replace_all {
            (content.replace(&old_string, &new_string), count)
        } else {
            (content.replacen(&old_string, &new_string, 1), 1)
        };

        if let Err(e) = tokio::fs::write(&path, new_content).await {
            return Ok(ToolResult::fail(format!(
                "Failed to write changes to file ({e})"
            )));
        }

        Ok(ToolResult::ok(format!(
            "Successfully replaced {replacements} occurrence(s) in {}",
            path.display()
        )))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
