//! The subagent runner: nested loops with restricted tools.
//!
//! Builds child agent loops sharing the parent's model backend, with the
//! type's tool whitelist, bash prefix list, iteration cap, and a system
//! prompt prefixed by the parent's base prompt. Background tasks run as
//! detached workers that buffer their display output and publish a
//! consume-once result on completion.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use llagent_core::{SessionStats, StopReason};
use llagent_llm::ModelBackend;
use llagent_permissions::AskResolver;
use llagent_tools::{
    SubagentOutcome, SubagentParams, SubagentSpawner, ToolRegistry,
};

use crate::agent_loop::{AgentLoop, ToolCallCallback};
use crate::config::AgentConfig;
use crate::interrupt::Interrupt;
use crate::prompts;
use crate::subagent::output::{DisplayStyle, OutputBuffer, OutputManager};

const PROMPT_PREVIEW_LEN: usize = 60;

struct BackgroundTask {
    description: String,
    cancel: CancellationToken,
}

/// Spawns and tracks nested agent loops.
pub struct SubagentRunner {
    self_weak: Weak<SubagentRunner>,
    backend: Arc<dyn ModelBackend>,
    registry: Arc<ToolRegistry>,
    parent_config: AgentConfig,
    base_prompt: String,
    resolver: Arc<dyn AskResolver>,
    parent_stats: Arc<Mutex<SessionStats>>,
    interrupt: Arc<Interrupt>,
    output: Arc<OutputManager>,
    tasks: Mutex<HashMap<String, BackgroundTask>>,
    completed: Mutex<HashMap<String, SubagentOutcome>>,
}

fn generate_task_id() -> String {
    const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect();
    format!("task-{suffix}")
}

fn prompt_preview(prompt: &str) -> String {
    if prompt.chars().count() <= PROMPT_PREVIEW_LEN {
        return prompt.to_owned();
    }
    let truncated: String = prompt.chars().take(PROMPT_PREVIEW_LEN).collect();
    format!("{truncated}...")
}

impl SubagentRunner {
    /// Create a runner sharing the parent's backend, registry, stats, and
    /// interrupt.
    #[must_use]
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        parent_config: AgentConfig,
        base_prompt: String,
        resolver: Arc<dyn AskResolver>,
        parent_stats: Arc<Mutex<SessionStats>>,
        interrupt: Arc<Interrupt>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            self_weak: weak.clone(),
            backend,
            registry,
            parent_config,
            base_prompt,
            resolver,
            parent_stats,
            interrupt,
            output: Arc::new(OutputManager::new()),
            tasks: Mutex::new(HashMap::new()),
            completed: Mutex::new(HashMap::new()),
        })
    }

    /// The output manager (exposed for display consumers).
    #[must_use]
    pub fn output(&self) -> &Arc<OutputManager> {
        &self.output
    }

    async fn run_internal(
        &self,
        params: SubagentParams,
        current_depth: u32,
        buffer: Option<Arc<OutputBuffer>>,
        interrupt: Arc<Interrupt>,
    ) -> SubagentOutcome {
        let type_config = params.subagent_type.config();
        let start = Instant::now();

        let sink: Arc<dyn Fn(String) + Send + Sync> = match &buffer {
            Some(buffer) => {
                let buffer = buffer.clone();
                Arc::new(move |line: String| buffer.write(DisplayStyle::Info, line))
            }
            None => {
                let output = self.output.clone();
                Arc::new(move |line: String| output.print_direct(&line))
            }
        };

        sink(format!(
            "› subagent {} ({}): {}\n",
            type_config.name,
            params.description,
            prompt_preview(&params.prompt)
        ));

        let mut child_config = self.parent_config.clone();
        child_config.max_iterations = type_config.max_iterations;
        child_config.verbose = false;
        child_config.enable_skills = false;
        child_config.enable_agents_md = false;
        child_config.skills_prompt_section.clear();
        child_config.agents_md_prompt_section.clear();

        let system_prompt = prompts::subagent_prompt(&self.base_prompt, params.subagent_type);
        let allowed: BTreeSet<String> = type_config
            .allowed_tools
            .iter()
            .map(|&t| t.to_owned())
            .collect();
        let bash_prefixes: Vec<String> =
            type_config.bash_prefixes.iter().map(|&p| p.to_owned()).collect();

        let tool_summaries: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let callback: ToolCallCallback = {
            let tool_summaries = tool_summaries.clone();
            let sink = sink.clone();
            Arc::new(move |name: &str, args: &str, elapsed_ms: u64| {
                tool_summaries.lock().push(format!("{name} ({elapsed_ms}ms)"));
                sink(format!("  › {name} {args} ({elapsed_ms}ms)\n"));
            })
        };

        let new_depth = current_depth + 1;
        let mut child = AgentLoop::new_subagent(
            self.backend.clone(),
            self.registry.clone(),
            child_config,
            self.resolver.clone(),
            interrupt,
            allowed,
            bash_prefixes,
            system_prompt,
            new_depth,
            Some(callback),
        );
        if let Some(runner) = self.self_weak.upgrade() {
            child.set_spawner(runner);
        }

        debug!(subagent = type_config.name, depth = new_depth, "subagent starting");
        let loop_result = child.run(&params.prompt).await;

        #[allow(clippy::cast_possible_truncation)]
        let elapsed_ms = start.elapsed().as_millis() as u64;
        sink(format!(
            "› subagent {} done ({elapsed_ms}ms)\n",
            type_config.name
        ));

        let child_stats = child.stats();
        self.parent_stats.lock().absorb_subagent(
            child_stats.input_tokens,
            child_stats.output_tokens,
            child_stats.cached_tokens,
        );

        let mut outcome = SubagentOutcome {
            iterations: loop_result.iterations,
            tool_calls: std::mem::take(&mut *tool_summaries.lock()),
            input_tokens: child_stats.input_tokens,
            output_tokens: child_stats.output_tokens,
            cached_tokens: child_stats.cached_tokens,
            ..Default::default()
        };

        match loop_result.stop_reason {
            StopReason::Completed => {
                outcome.success = true;
                outcome.output = loop_result.final_response;
            }
            StopReason::MaxIterations => {
                outcome.output = loop_result.final_response;
                outcome.error = format!(
                    "Reached maximum iterations ({})",
                    type_config.max_iterations
                );
            }
            StopReason::UserCancelled => {
                outcome.error = "User cancelled".to_owned();
            }
            StopReason::AgentError => {
                outcome.error = format!("Agent error: {}", loop_result.final_response);
            }
        }

        info!(
            subagent = type_config.name,
            success = outcome.success,
            iterations = outcome.iterations,
            elapsed_ms,
            "subagent finished"
        );
        outcome
    }
}

#[async_trait]
impl SubagentSpawner for SubagentRunner {
    fn can_spawn(&self, current_depth: u32) -> bool {
        current_depth < self.parent_config.max_subagent_depth
    }

    fn max_depth(&self) -> u32 {
        self.parent_config.max_subagent_depth
    }

    async fn run(&self, params: SubagentParams, current_depth: u32) -> SubagentOutcome {
        self.run_internal(params, current_depth, None, self.interrupt.clone())
            .await
    }

    async fn start_background(&self, params: SubagentParams, current_depth: u32) -> String {
        let task_id = generate_task_id();
        let buffer = self.output.create_buffer(&task_id);

        // Derive a per-task token so cancel(id) stops only this task while
        // a parent interrupt still reaches it.
        let task_token = self.interrupt.current().child_token();
        let task_interrupt = Arc::new(Interrupt::from_token(task_token.clone()));

        let _ = self.tasks.lock().insert(
            task_id.clone(),
            BackgroundTask {
                description: params.description.clone(),
                cancel: task_token,
            },
        );

        let runner = self.self_weak.upgrade().expect("runner is alive");
        let worker_id = task_id.clone();
        let _ = tokio::spawn(async move {
            let outcome = runner
                .run_internal(params, current_depth, Some(buffer), task_interrupt)
                .await;
            // Flush buffered display atomically, then publish the result.
            runner.output.flush(&worker_id, true);
            runner.output.remove_buffer(&worker_id);
            let _ = runner.completed.lock().insert(worker_id.clone(), outcome);
            let _ = runner.tasks.lock().remove(&worker_id);
        });

        info!(task_id, "background subagent started");
        task_id
    }

    fn is_complete(&self, task_id: &str) -> bool {
        self.completed.lock().contains_key(task_id)
    }

    async fn take_result(&self, task_id: &str) -> Option<SubagentOutcome> {
        self.completed.lock().remove(task_id)
    }

    fn active_tasks(&self) -> Vec<String> {
        self.tasks.lock().keys().cloned().collect()
    }

    fn cancel(&self, task_id: &str) -> bool {
        match self.tasks.lock().get(task_id) {
            Some(task) => {
                debug!(task_id, description = %task.description, "cancelling background subagent");
                task.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
