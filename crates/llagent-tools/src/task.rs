//! `task` tool — recursive sub-task delegation.
//!
//! Spawns a nested agent loop via the [`SubagentSpawner`] handle in the
//! tool context. Synchronous runs block until the child finishes;
//! background runs return a `task-…` id that later `resume` calls poll.
//! Depth is gated before anything else so a child at the cap gets a tool
//! failure, not a panic.

use async_trait::async_trait;
use serde_json::{json, Value};

use llagent_core::{ToolResult, ToolSchema};

use crate::subagent::{SubagentOutcome, SubagentParams, SubagentType};
use crate::traits::{AgentTool, ToolContext, ToolError};
use crate::util::{optional_bool, optional_str};

/// The `task` tool.
pub struct TaskTool;

fn format_outcome(header: String, outcome: &SubagentOutcome) -> String {
    let mut output = header;
    if !outcome.tool_calls.is_empty() {
        output.push_str("\nTools called:\n");
        for call in &outcome.tool_calls {
            output.push_str(&format!("  - {call}\n"));
        }
    }
    if !outcome.output.is_empty() {
        output.push_str(&format!("\nResult:\n{}", outcome.output));
    }
    output
}

#[async_trait]
impl AgentTool for TaskTool {
    fn name(&self) -> &str {
        "task"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "task".into(),
            description: "Spawn a subagent to handle a complex task autonomously. Use for parallel exploration, planning, or delegating multi-step operations. The subagent runs with restricted tools based on its type and returns results when complete.\n\nTypes:\n- explore: Read-only codebase exploration (glob, read, limited bash)\n- plan: Architecture and design planning (glob, read)\n- general: Multi-step task execution (all tools except task)\n- bash: Shell command execution only\n\nBackground mode:\n- Set run_in_background=true to start the task without waiting\n- Returns a task_id that can be used with the resume parameter\n- Call again with resume=\"task_id\" to check status or get results".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "subagent_type": {
                        "type": "string",
                        "enum": ["explore", "plan", "general", "bash"],
                        "description": "Type of subagent to spawn. Each type has different tool access.",
                        "default": "general"
                    },
                    "prompt": {
                        "type": "string",
                        "description": "The task description for the subagent to execute. Required for new tasks."
                    },
                    "description": {
                        "type": "string",
                        "description": "Short description shown in output (3-5 words)"
                    },
                    "run_in_background": {
                        "type": "boolean",
                        "description": "If true, start the task in background and return immediately with a task_id",
                        "default": false
                    },
                    "resume": {
                        "type": "string",
                        "description": "Task ID to resume/check status. When provided, other parameters are ignored."
                    }
                },
                "required": []
            }),
        }
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let Some(spawner) = ctx.spawner.as_ref() else {
            return Ok(ToolResult::fail(
                "Internal error: subagent context not initialized",
            ));
        };

        if !spawner.can_spawn(ctx.subagent_depth) {
            return Ok(ToolResult::fail(format!(
                "Cannot spawn subagent: maximum nesting depth reached (depth={}, max={})",
                ctx.subagent_depth,
                spawner.max_depth()
            )));
        }

        let type_str = {
            let raw = optional_str(&args, "subagent_type");
            if raw.is_empty() {
                "general".to_owned()
            } else {
                raw
            }
        };
        let prompt = optional_str(&args, "prompt");
        let description = optional_str(&args, "description");
        let run_in_background = optional_bool(&args, "run_in_background");
        let resume_id = optional_str(&args, "resume");

        if !resume_id.is_empty() {
            if spawner.is_complete(&resume_id) {
                let Some(outcome) = spawner.take_result(&resume_id).await else {
                    return Ok(ToolResult::fail(format!(
                        "Task not found: {resume_id}. It may have already completed or never existed."
                    )));
                };
                let header = format!(
                    "Background task {resume_id} completed {} in {} iteration(s)\n",
                    if outcome.success { "successfully" } else { "with errors" },
                    outcome.iterations
                );
                return Ok(ToolResult {
                    success: outcome.success,
                    output: format_outcome(header, &outcome),
                    error: outcome.error,
                });
            }

            if spawner.active_tasks().contains(&resume_id) {
                return Ok(ToolResult::ok(format!(
                    "Task {resume_id} is still running. Call task with resume=\"{resume_id}\" again later to get results."
                )));
            }
            return Ok(ToolResult::fail(format!(
                "Task not found: {resume_id}. It may have already completed or never existed."
            )));
        }

        if prompt.is_empty() {
            return Ok(ToolResult::fail(
                "The 'prompt' parameter is required for new tasks",
            ));
        }

        let Some(subagent_type) = SubagentType::parse(&type_str) else {
            return Ok(ToolResult::fail(format!(
                "Invalid subagent_type: {type_str}. Valid types: explore, plan, general, bash"
            )));
        };

        let params = SubagentParams {
            subagent_type,
            prompt,
            description: if description.is_empty() {
                format!("{type_str}-task")
            } else {
                description
            },
        };

        if run_in_background {
            let task_id = spawner
                .start_background(params.clone(), ctx.subagent_depth)
                .await;
            return Ok(ToolResult::ok(format!(
                "Started background task: {task_id}\nType: {}\nDescription: {}\n\nTo check status or get results, call task with resume=\"{task_id}\"",
                subagent_type.name(),
                params.description
            )));
        }

        let outcome = spawner.run(params, ctx.subagent_depth).await;
        let header = format!(
            "Subagent ({}) {} in {} iteration(s)\n",
            subagent_type.name(),
            if outcome.success { "completed" } else { "failed" },
            outcome.iterations
        );
        Ok(ToolResult {
            success: outcome.success,
            output: format_outcome(header, &outcome),
            error: outcome.error,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
