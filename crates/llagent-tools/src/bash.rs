//! `bash` tool — shell command execution.
//!
//! Runs `/bin/sh -c <command>` in the working directory, capturing combined
//! stdout+stderr. Two hard caps apply: 30000 bytes of output and 50 lines
//! for display. Timeout and interrupt kill the child; exit code and timeout
//! annotations are appended to the output.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use llagent_core::{ToolResult, ToolSchema};

use crate::traits::{AgentTool, ToolContext, ToolError};
use crate::util::{optional_u64, required_str, truncate_at_boundary};

const MAX_OUTPUT_LENGTH: usize = 30000;
const MAX_OUTPUT_LINES: usize = 50;

/// The `bash` tool.
pub struct BashTool;

/// Keep at most `max_lines` lines, annotating how many were dropped.
fn truncate_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max_lines {
        return text.to_owned();
    }
    let mut out = lines[..max_lines].join("\n");
    out.push('\n');
    out.push_str(&format!("… +{} more lines", lines.len() - max_lines));
    out
}

enum RunOutcome {
    Finished { exit_code: i32, output: String },
    TimedOut { output: String },
    Interrupted { output: String },
}

async fn run_shell(command: &str, ctx: &ToolContext, timeout_ms: u64) -> Result<RunOutcome, ToolError> {
    let mut cmd = tokio::process::Command::new("/bin/sh");
    let _ = cmd
        .arg("-c")
        .arg(command)
        .current_dir(&ctx.working_dir)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    debug!(command, working_dir = %ctx.working_dir.display(), "spawning shell");

    let child = cmd.spawn().map_err(|e| ToolError::Internal {
        message: format!("Failed to spawn process: {e}"),
    })?;

    let timeout = std::time::Duration::from_millis(timeout_ms);
    let cancel = ctx.cancellation.clone();

    tokio::select! {
        result = child.wait_with_output() => {
            let output = result.map_err(|e| ToolError::Internal {
                message: format!("Process wait failed: {e}"),
            })?;
            let exit_code = output.status.code().unwrap_or(-1);
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.is_empty() {
                if !combined.is_empty() {
                    combined.push('\n');
                }
                combined.push_str(&stderr);
            }
            Ok(RunOutcome::Finished { exit_code, output: combined })
        }
        () = tokio::time::sleep(timeout) => {
            // kill_on_drop reaps the child when the future is dropped.
            Ok(RunOutcome::TimedOut { output: String::new() })
        }
        () = cancel.cancelled() => {
            Ok(RunOutcome::Interrupted { output: String::new() })
        }
    }
}

#[async_trait]
impl AgentTool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "bash".into(),
            description: "Execute a bash/shell command. Use for running programs, git operations, build commands, etc. The command runs in the project working directory.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to execute"
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Optional timeout in milliseconds (default 120000)"
                    }
                },
                "required": ["command"]
            }),
        }
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let command = match required_str(&args, "command") {
            Ok(c) => c,
            Err(failure) => return Ok(failure),
        };
        let timeout_ms = optional_u64(&args, "timeout").unwrap_or(ctx.timeout_ms);

        let outcome = run_shell(&command, ctx, timeout_ms).await?;

        let (raw_output, exit_code, timed_out, interrupted) = match outcome {
            RunOutcome::Finished { exit_code, output } => (output, exit_code, false, false),
            RunOutcome::TimedOut { output } => (output, 0, true, false),
            RunOutcome::Interrupted { output } => (output, -1, false, true),
        };

        let capped = truncate_at_boundary(&raw_output, MAX_OUTPUT_LENGTH);
        let mut result_output = truncate_lines(capped, MAX_OUTPUT_LINES);

        if raw_output.len() >= MAX_OUTPUT_LENGTH {
            result_output.push_str(&format!(
                "\n[Output truncated at {MAX_OUTPUT_LENGTH} characters]"
            ));
        }
        if timed_out {
            result_output.push_str(&format!("\n[Timed out after {timeout_ms}ms]"));
        }
        if exit_code != 0 {
            result_output.push_str(&format!("\n[Exit code: {exit_code}]"));
        }

        let success = exit_code == 0 && !timed_out && !interrupted;
        Ok(ToolResult {
            success,
            output: result_output,
            error: String::new(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
