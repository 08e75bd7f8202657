//! `read` tool — numbered-line file reading.
//!
//! Output lines are `{:>6}| {content}` with per-line truncation at 2000
//! characters. A range/total summary is appended, with an offset hint when
//! more lines remain. Sensitive files are refused outright.

use async_trait::async_trait;
use serde_json::{json, Value};

use llagent_core::{ToolResult, ToolSchema};
use llagent_permissions::is_sensitive_file;

use crate::traits::{AgentTool, ToolContext, ToolError};
use crate::util::{optional_u64, required_str, resolve_path};

const DEFAULT_LIMIT: usize = 2000;
const MAX_LINE_LENGTH: usize = 2000;

/// The `read` tool.
pub struct ReadTool;

fn format_line(line_number: usize, line: &str) -> String {
    let display = if line.chars().count() > MAX_LINE_LENGTH {
        let truncated: String = line.chars().take(MAX_LINE_LENGTH).collect();
        format!("{truncated}...")
    } else {
        line.to_owned()
    };
    format!("{line_number:>6}| {display}\n")
}

#[async_trait]
impl AgentTool for ReadTool {
    fn name(&self) -> &str {
        "read"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "read".into(),
            description: "Read the contents of a file. Returns numbered lines for easy reference. Use offset and limit for large files.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file to read (absolute or relative to working directory)"
                    },
                    "offset": {
                        "type": "integer",
                        "description": "Line number to start reading from (0-based, default 0)"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of lines to read (default 2000)"
                    }
                },
                "required": ["file_path"]
            }),
        }
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let file_path = match required_str(&args, "file_path") {
            Ok(p) => p,
            Err(failure) => return Ok(failure),
        };
        #[allow(clippy::cast_possible_truncation)]
        let offset = optional_u64(&args, "offset").unwrap_or(0) as usize;
        #[allow(clippy::cast_possible_truncation)]
        let limit = optional_u64(&args, "limit").unwrap_or(DEFAULT_LIMIT as u64) as usize;

        let path = resolve_path(&file_path, &ctx.working_dir);

        let Ok(metadata) = tokio::fs::metadata(&path).await else {
            return Ok(ToolResult::fail(format!("File not found: {}", path.display())));
        };
        if !metadata.is_file() {
            return Ok(ToolResult::fail(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        if is_sensitive_file(&path) {
            return Ok(ToolResult::fail(format!(
                "Cannot read sensitive file (contains credentials/secrets): {}",
                path.display()
            )));
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) => {
                return Ok(ToolResult::fail(format!(
                    "Cannot open file: {} ({e})",
                    path.display()
                )))
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        let all_lines: Vec<&str> = content.lines().collect();
        let total = all_lines.len();

        let start = offset.min(total);
        let end = (start + limit).min(total);

        let mut output = String::new();
        for (i, line) in all_lines[start..end].iter().enumerate() {
            output.push_str(&format_line(start + i + 1, line));
        }

        let (first, last) = if end > start { (start + 1, end) } else { (0, 0) };
        output.push_str(&format!("\n[Lines {first}-{last} of {total} total]"));
        if end < total {
            output.push_str(&format!(" Use offset={end} to read more."));
        }

        Ok(ToolResult::ok(output))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn ctx_in(dir: &Path) -> ToolContext {
        ToolContext::new(dir, 120_000)
    }

    async fn read(dir: &Path, args: Value) -> ToolResult {
        ReadTool.execute(args, &ctx_in(dir)).await.unwrap()
    }

    #[tokio::test]
    async fn five_line_file_full_read() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.md"), "one\ntwo\nthree\nfour\nfive\n").unwrap();

        let r = read(dir.path(), json!({"file_path": "README.md"})).await;
        assert!(r.success);
        assert!(r.output.starts_with("     1| one\n     2| two\n"));
        assert!(r.output.ends_with("[Lines 1-5 of 5 total]"));
        assert!(!r.output.contains("read more"));
    }

    #[tokio::test]
    async fn offset_and_limit_window() {
        let dir = tempfile::tempdir().unwrap();
        let content: String = (1..=20).map(|i| format!("line {i}\n")).collect();
        std::fs::write(dir.path().join("big.txt"), content).unwrap();

        let r = read(
            dir.path(),
            json!({"file_path": "big.txt", "offset": 5, "limit": 3}),
        )
        .await;
        assert!(r.output.contains("     6| line 6\n"));
        assert!(r.output.contains("     8| line 8\n"));
        assert!(!r.output.contains("line 9"));
        assert!(r.output.contains("[Lines 6-8 of 20 total] Use offset=8 to read more."));
    }

    #[tokio::test]
    async fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let r = read(dir.path(), json!({"file_path": "nope.txt"})).await;
        assert!(!r.success);
        assert!(r.error.starts_with("File not found: "));
    }

    #[tokio::test]
    async fn directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let r = read(dir.path(), json!({"file_path": "sub"})).await;
        assert!(!r.success);
        assert!(r.error.starts_with("Not a regular file: "));
    }

    #[tokio::test]
    async fn sensitive_file_is_blocked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "SECRET=1\n").unwrap();
        let r = read(dir.path(), json!({"file_path": ".env"})).await;
        assert!(!r.success);
        assert!(r.error.contains("sensitive file"));
    }

    #[tokio::test]
    async fn long_lines_truncated_with_ellipsis() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("long.txt"), "x".repeat(3000)).unwrap();
        let r = read(dir.path(), json!({"file_path": "long.txt"})).await;
        assert!(r.output.contains(&format!("{}...", "x".repeat(2000))));
    }

    #[tokio::test]
    async fn offset_past_end_yields_empty_window() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("small.txt"), "a\nb\n").unwrap();
        let r = read(
            dir.path(),
            json!({"file_path": "small.txt", "offset": 100}),
        )
        .await;
        assert!(r.success);
        assert!(r.output.contains("[Lines 0-0 of 2 total]"));
    }

    #[tokio::test]
    async fn missing_file_path_param() {
        let dir = tempfile::tempdir().unwrap();
        let r = read(dir.path(), json!({})).await;
        assert!(!r.success);
        assert_eq!(r.error, "file_path parameter is required");
    }

    #[test]
    fn line_numbers_right_aligned_to_six() {
        assert_eq!(format_line(1, "a"), "     1| a\n");
        assert_eq!(format_line(12345, "b"), " 12345| b\n");
        assert_eq!(format_line(1234567, "c"), "1234567| c\n");
    }
}
