//! The agent loop: model turns coupled to tool executions.
//!
//! Each iteration posts the conversation and tool schemas, streams the
//! response out as events, then walks the parsed tool calls in order
//! through the permission pipeline (external-path pre-check, doom-loop
//! gate, policy decision, ASK resolution) before dispatching to the
//! registry. Results append as tool messages and the loop repeats until the
//! model stops calling tools, the iteration cap trips, the user interrupts,
//! or the stream errors.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use llagent_core::{
    AgentEvent, AssistantToolCall, ChatMessage, SessionStats, StopReason, ToolResult,
};
use llagent_llm::envelope::parse_tool_call_envelopes;
use llagent_llm::{
    CompletionRequest, CompletionToolCall, ModelBackend, ModelChunk, Timings,
};
use llagent_permissions::{
    args_hash, AskResolver, PermissionRequest, PermissionState, PermissionType, PolicyEngine,
    SharedPolicy,
};
use llagent_tools::util::resolve_path;
use llagent_tools::{SubagentSpawner, ToolContext, ToolRegistry};

use crate::config::AgentConfig;
use crate::emitter::EventEmitter;
use crate::interrupt::Interrupt;
use crate::prompts;

const DISPLAY_OUTPUT_CAP: usize = 500;
const ARGS_SUMMARY_CAP: usize = 60;

/// Result of one `run` call.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopResult {
    /// Why the loop stopped.
    pub stop_reason: StopReason,
    /// Final assistant response (or a stop-condition message).
    pub final_response: String,
    /// Iterations consumed.
    pub iterations: u32,
}

/// Callback reporting subagent tool calls upward: name, truncated
/// arguments, elapsed milliseconds.
pub type ToolCallCallback = Arc<dyn Fn(&str, &str, u64) + Send + Sync>;

struct Generation {
    content: String,
    tool_calls: Vec<CompletionToolCall>,
    timings: Timings,
    aborted: bool,
}

/// The model↔tools state machine.
pub struct AgentLoop {
    backend: Arc<dyn ModelBackend>,
    registry: Arc<ToolRegistry>,
    config: AgentConfig,
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    policy: SharedPolicy,
    resolver: Arc<dyn AskResolver>,
    emitter: Arc<EventEmitter>,
    interrupt: Arc<Interrupt>,
    stats: Arc<Mutex<SessionStats>>,
    allowed_tools: Option<BTreeSet<String>>,
    bash_prefixes: Vec<String>,
    depth: u32,
    on_tool_call: Option<ToolCallCallback>,
    spawner: Option<Arc<dyn SubagentSpawner>>,
}

impl AgentLoop {
    /// Root constructor: composes the default system prompt (plus
    /// project-context and skills sections carried in the config).
    #[must_use]
    pub fn new_root(
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
        policy: SharedPolicy,
        resolver: Arc<dyn AskResolver>,
        emitter: Arc<EventEmitter>,
        interrupt: Arc<Interrupt>,
    ) -> Self {
        let system_prompt = prompts::compose_root_prompt(&config);
        Self {
            backend,
            registry,
            config,
            messages: Arc::new(Mutex::new(vec![ChatMessage::system(system_prompt)])),
            policy,
            resolver,
            emitter,
            interrupt,
            stats: Arc::new(Mutex::new(SessionStats::default())),
            allowed_tools: None,
            bash_prefixes: Vec::new(),
            depth: 0,
            on_tool_call: None,
            spawner: None,
        }
    }

    /// Subagent constructor: custom system prompt, restricted tool set,
    /// optional bash prefix allow-list, nesting depth, and a parent
    /// callback for tool-call reporting. Subagents get a fresh policy
    /// engine and an unobserved emitter.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new_subagent(
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        config: AgentConfig,
        resolver: Arc<dyn AskResolver>,
        interrupt: Arc<Interrupt>,
        allowed_tools: BTreeSet<String>,
        bash_prefixes: Vec<String>,
        system_prompt: String,
        depth: u32,
        on_tool_call: Option<ToolCallCallback>,
    ) -> Self {
        let policy = PolicyEngine::new(&config.working_dir, config.yolo).into_shared();
        Self {
            backend,
            registry,
            config,
            messages: Arc::new(Mutex::new(vec![ChatMessage::system(system_prompt)])),
            policy,
            resolver,
            emitter: Arc::new(EventEmitter::new()),
            interrupt,
            stats: Arc::new(Mutex::new(SessionStats::default())),
            allowed_tools: Some(allowed_tools),
            bash_prefixes,
            depth,
            on_tool_call,
            spawner: None,
        }
    }

    /// Install the subagent runner handle forwarded to the `task` tool.
    pub fn set_spawner(&mut self, spawner: Arc<dyn SubagentSpawner>) {
        self.spawner = Some(spawner);
    }

    /// Restrict the tools advertised to the model (session-level allow
    /// list).
    pub fn restrict_tools(&mut self, allowed: BTreeSet<String>) {
        self.allowed_tools = Some(allowed);
    }

    /// Shared handle to the conversation (snapshot under the mutex).
    #[must_use]
    pub fn messages_handle(&self) -> Arc<Mutex<Vec<ChatMessage>>> {
        self.messages.clone()
    }

    /// Shared handle to the policy core (the ASK drivers write session
    /// overrides into it).
    #[must_use]
    pub fn policy_handle(&self) -> SharedPolicy {
        self.policy.clone()
    }

    /// Shared handle to the session counters.
    #[must_use]
    pub fn stats_handle(&self) -> Arc<Mutex<SessionStats>> {
        self.stats.clone()
    }

    /// Snapshot of the session counters.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        *self.stats.lock()
    }

    /// Snapshot of the conversation.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().clone()
    }

    /// Truncate the conversation back to the system message and drop the
    /// permission session state.
    pub fn clear(&mut self) {
        self.messages.lock().truncate(1);
        self.policy.lock().clear_session();
    }

    /// Drive the loop for one user prompt.
    pub async fn run(&mut self, user_prompt: &str) -> LoopResult {
        self.messages.lock().push(ChatMessage::user(user_prompt));

        let mut iterations = 0u32;
        while iterations < self.config.max_iterations {
            if self.interrupt.is_triggered() {
                return self.finish(StopReason::UserCancelled, String::new(), iterations);
            }

            iterations += 1;
            self.emitter.emit(AgentEvent::IterationStart {
                iteration: iterations,
                max_iterations: self.config.max_iterations,
            });
            debug!(iteration = iterations, depth = self.depth, "iteration started");

            let generation = match self.generate_completion().await {
                Ok(g) => g,
                Err(e) => {
                    warn!(error = %e, "model stream failed");
                    self.emitter.emit(AgentEvent::Error {
                        message: e.to_string(),
                    });
                    return self.finish(StopReason::AgentError, e.to_string(), iterations);
                }
            };

            self.accumulate_timings(generation.timings);

            if generation.aborted {
                // Preserve partial content so the user can resume.
                if !generation.content.is_empty() {
                    self.messages
                        .lock()
                        .push(ChatMessage::assistant(generation.content.clone()));
                }
                return self.finish(StopReason::UserCancelled, generation.content, iterations);
            }

            // Fabricate ids for calls the model left unnamed.
            let calls: Vec<(AssistantToolCall, CompletionToolCall)> = generation
                .tool_calls
                .into_iter()
                .map(|call| {
                    let id = if call.id.is_empty() {
                        format!("call_{iterations}")
                    } else {
                        call.id.clone()
                    };
                    (
                        AssistantToolCall::new(id, &call.name, &call.arguments),
                        call,
                    )
                })
                .collect();

            self.messages.lock().push(ChatMessage::assistant_with_calls(
                generation.content.clone(),
                calls.iter().map(|(wire, _)| wire.clone()).collect(),
            ));

            if calls.is_empty() {
                return self.finish(StopReason::Completed, generation.content, iterations);
            }

            for (wire, call) in &calls {
                if self.interrupt.is_triggered() {
                    return self.finish(StopReason::UserCancelled, String::new(), iterations);
                }
                let result = self.execute_tool_call(call).await;
                self.messages.lock().push(ChatMessage::tool(
                    &wire.id,
                    &call.name,
                    result.to_message_content(),
                ));
            }
        }

        let final_response = format!(
            "Reached maximum iterations ({})",
            self.config.max_iterations
        );
        self.finish(StopReason::MaxIterations, final_response, iterations)
    }

    fn finish(&self, stop_reason: StopReason, final_response: String, iterations: u32) -> LoopResult {
        if stop_reason != StopReason::AgentError {
            self.emitter.emit(AgentEvent::Completed {
                reason: stop_reason,
                stats: self.stats(),
            });
        }
        info!(?stop_reason, iterations, depth = self.depth, "loop finished");
        LoopResult {
            stop_reason,
            final_response,
            iterations,
        }
    }

    fn accumulate_timings(&self, timings: Timings) {
        let mut stats = self.stats.lock();
        if timings.prompt_n > 0 {
            stats.input_tokens += timings.prompt_n;
            stats.prompt_ms += timings.prompt_ms;
        }
        if timings.predicted_n > 0 {
            stats.output_tokens += timings.predicted_n;
            stats.predicted_ms += timings.predicted_ms;
        }
        if timings.cache_n > 0 {
            stats.cached_tokens += timings.cache_n;
        }
    }

    async fn generate_completion(&self) -> Result<Generation, llagent_llm::BackendError> {
        let tools = match &self.allowed_tools {
            Some(allowed) => self.registry.schemas_filtered(allowed),
            None => self.registry.schemas(),
        };
        let request = CompletionRequest {
            messages: self.messages(),
            tools,
            tool_choice: "auto".into(),
        };

        let mut stream = self.backend.stream(&request).await?;
        let cancel = self.interrupt.current();

        let mut streamed_content = String::new();
        let mut final_frame = None;

        loop {
            tokio::select! {
                chunk = stream.next() => match chunk {
                    Some(Ok(ModelChunk::Delta(delta))) => {
                        if !delta.content.is_empty() {
                            streamed_content.push_str(&delta.content);
                            self.emitter.emit(AgentEvent::TextDelta {
                                content: delta.content,
                            });
                        }
                        if !delta.reasoning.is_empty() {
                            self.emitter.emit(AgentEvent::ReasoningDelta {
                                content: delta.reasoning,
                            });
                        }
                    }
                    Some(Ok(ModelChunk::Final(frame))) => {
                        final_frame = Some(frame);
                        break;
                    }
                    Some(Err(e)) => return Err(e),
                    None => break,
                },
                () = cancel.cancelled() => {
                    // Abandon the stream at the next chunk boundary.
                    return Ok(Generation {
                        content: streamed_content,
                        tool_calls: Vec::new(),
                        timings: Timings::default(),
                        aborted: true,
                    });
                }
            }
        }

        // Prefer the server-parsed message; fall back to the concatenated
        // content, recovering envelope-style tool calls from the text.
        let (content, tool_calls, timings) = match final_frame {
            Some(frame) => {
                let timings = frame.timings;
                match frame.message {
                    Some(message) => (message.content, message.tool_calls, timings),
                    None => {
                        let content = if frame.content.is_empty() {
                            streamed_content
                        } else {
                            frame.content
                        };
                        (content, Vec::new(), timings)
                    }
                }
            }
            None => (streamed_content, Vec::new(), Timings::default()),
        };

        let (content, tool_calls) = if tool_calls.is_empty() {
            let (cleaned, parsed) = parse_tool_call_envelopes(&content);
            if parsed.is_empty() {
                (content, tool_calls)
            } else {
                (cleaned, parsed)
            }
        } else {
            (content, tool_calls)
        };

        Ok(Generation {
            content,
            tool_calls,
            timings,
            aborted: false,
        })
    }

    fn permission_type_for(tool_name: &str) -> PermissionType {
        match tool_name {
            "read" => PermissionType::FileRead,
            "write" => PermissionType::FileWrite,
            "edit" => PermissionType::FileEdit,
            "glob" => PermissionType::Glob,
            _ => PermissionType::Bash,
        }
    }

    /// Gate an EXTERNAL_DIR request through the policy (so yolo and session
    /// overrides apply) and prompt on ASK. Returns whether the operation
    /// may proceed.
    async fn check_external_path(&self, tool_name: &str, path: &Path) -> bool {
        let request = PermissionRequest {
            permission_type: PermissionType::ExternalDir,
            tool_name: tool_name.to_owned(),
            details: format!("External file: {}", path.display()),
            is_dangerous: true,
            description: "Operation outside working directory".to_owned(),
        };
        match self.policy.lock().check_permission(&request) {
            PermissionState::Allow | PermissionState::AllowSession => return true,
            PermissionState::Deny | PermissionState::DenySession => return false,
            PermissionState::Ask => {}
        }
        self.resolver.resolve(&request).await.is_allowed()
    }

    async fn execute_tool_call(&self, call: &CompletionToolCall) -> ToolResult {
        if !self.registry.contains(&call.name) {
            return ToolResult::fail(format!("Unknown tool: {}", call.name));
        }

        let args: Value = match serde_json::from_str(&call.arguments) {
            Ok(v) => v,
            Err(e) => return ToolResult::fail(format!("Invalid JSON arguments: {e}")),
        };

        let mut request = PermissionRequest::new(
            Self::permission_type_for(&call.name),
            &call.name,
            &call.arguments,
        );
        if call.name == "bash" {
            let command = args
                .get("command")
                .and_then(Value::as_str)
                .unwrap_or_default();
            request.details = command.to_owned();
            request.is_dangerous = PolicyEngine::is_dangerous_command(command);
        }

        // External-path pre-check for file operations.
        if matches!(call.name.as_str(), "read" | "write" | "edit") {
            if let Some(file_path) = args.get("file_path").and_then(Value::as_str) {
                if !file_path.is_empty() {
                    let path = resolve_path(file_path, &self.config.working_dir);
                    let external = self.policy.lock().is_external_path(&path);
                    if external && !self.check_external_path(&call.name, &path).await {
                        return ToolResult::fail("Blocked: File is outside working directory");
                    }
                }
            }
        }

        // Doom-loop gate: three identical consecutive dispatches force an
        // ASK regardless of the policy verdict.
        let hash = args_hash(&call.arguments);
        if self.policy.lock().is_doom_loop(&call.name, &hash) {
            let mut doom_request = request.clone();
            doom_request.description =
                "Detected repeated identical tool calls (doom loop)".to_owned();
            if !self.resolver.resolve(&doom_request).await.is_allowed() {
                return ToolResult::fail("Blocked: Detected repeated identical tool calls");
            }
        }

        let permission_state = self.policy.lock().check_permission(&request);
        match permission_state {
            PermissionState::Deny | PermissionState::DenySession => {
                return ToolResult::fail(format!("Permission denied for {}", call.name));
            }
            PermissionState::Ask => {
                if !self.resolver.resolve(&request).await.is_allowed() {
                    return ToolResult::fail(format!(
                        "User denied permission for {}",
                        call.name
                    ));
                }
            }
            PermissionState::Allow | PermissionState::AllowSession => {}
        }

        self.policy.lock().record_tool_call(&call.name, &hash);

        self.emitter.emit(AgentEvent::ToolStart {
            name: call.name.clone(),
            args: call.arguments.clone(),
        });

        let ctx = ToolContext {
            working_dir: self.config.working_dir.clone(),
            cancellation: self.interrupt.current(),
            timeout_ms: self.config.tool_timeout_ms,
            subagent_depth: self.depth,
            spawner: self.spawner.clone(),
        };

        let start = Instant::now();
        let result = if self.bash_prefixes.is_empty() {
            self.registry.execute(&call.name, args, &ctx).await
        } else {
            self.registry
                .execute_filtered(&call.name, args, &ctx, &self.bash_prefixes)
                .await
        };
        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = start.elapsed().as_millis() as u64;

        self.emitter.emit(AgentEvent::ToolResult {
            name: call.name.clone(),
            success: result.success,
            output: truncate_for_display(&result.output),
            duration_ms,
        });
        debug!(
            tool = %call.name,
            success = result.success,
            duration_ms,
            "tool executed"
        );

        if let Some(callback) = &self.on_tool_call {
            callback(&call.name, &summarize_args(&call.arguments), duration_ms);
        }

        result
    }
}

fn truncate_for_display(output: &str) -> String {
    if output.len() <= DISPLAY_OUTPUT_CAP {
        return output.to_owned();
    }
    let mut end = DISPLAY_OUTPUT_CAP;
    while end > 0 && !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n... (truncated)", &output[..end])
}

fn summarize_args(arguments: &str) -> String {
    if arguments.chars().count() <= ARGS_SUMMARY_CAP {
        return arguments.to_owned();
    }
    let truncated: String = arguments.chars().take(ARGS_SUMMARY_CAP).collect();
    format!("{truncated}...")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_type_mapping() {
        assert_eq!(
            AgentLoop::permission_type_for("read"),
            PermissionType::FileRead
        );
        assert_eq!(
            AgentLoop::permission_type_for("write"),
            PermissionType::FileWrite
        );
        assert_eq!(
            AgentLoop::permission_type_for("edit"),
            PermissionType::FileEdit
        );
        assert_eq!(AgentLoop::permission_type_for("glob"), PermissionType::Glob);
        assert_eq!(AgentLoop::permission_type_for("bash"), PermissionType::Bash);
        // Anything else (task, MCP tools) defaults to the bash category.
        assert_eq!(AgentLoop::permission_type_for("task"), PermissionType::Bash);
        assert_eq!(
            AgentLoop::permission_type_for("mcp__files__search"),
            PermissionType::Bash
        );
    }

    #[test]
    fn display_truncation_caps_at_500() {
        let long = "x".repeat(600);
        let shown = truncate_for_display(&long);
        assert!(shown.ends_with("\n... (truncated)"));
        assert!(shown.len() < long.len());
        assert_eq!(truncate_for_display("short"), "short");
    }

    #[test]
    fn args_summary_caps_at_60() {
        let long = "y".repeat(100);
        let summary = summarize_args(&long);
        assert_eq!(summary.chars().count(), 63);
        assert!(summary.ends_with("..."));
        assert_eq!(summarize_args("{}"), "{}");
    }
}
