//! Tool registry: the namespace of callable tools.
//!
//! Two dispatch paths: [`ToolRegistry::execute`] for the root agent and
//! [`ToolRegistry::execute_filtered`] for subagents, which additionally
//! rejects `bash` commands whose `command` does not match the caller's
//! prefix allow-list. Unknown tools and tool errors are tool results, never
//! fatal.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use llagent_core::{ToolResult, ToolSchema};

use crate::traits::{AgentTool, ToolContext};

/// Mapping from tool name to implementation.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn AgentTool>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Overwrites any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn AgentTool>) {
        debug!(tool_name = tool.name(), "tool registered");
        let _ = self.tools.insert(tool.name().to_owned(), tool);
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.tools.get(name).cloned()
    }

    /// Whether a tool with the given name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Schemas of all tools.
    #[must_use]
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Schemas of the allowed subset.
    #[must_use]
    pub fn schemas_filtered(&self, allowed: &BTreeSet<String>) -> Vec<ToolSchema> {
        self.tools
            .values()
            .filter(|t| allowed.contains(t.name()))
            .map(|t| t.schema())
            .collect()
    }

    /// Execute a tool, adapting every failure mode into a tool result.
    pub async fn execute(&self, name: &str, args: Value, ctx: &ToolContext) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::fail(format!("Unknown tool: {name}"));
        };
        match tool.execute(args, ctx).await {
            Ok(result) => result,
            Err(e) => ToolResult::fail(format!("Tool execution error: {e}")),
        }
    }

    /// Execute with a bash prefix allow-list (read-only subagents).
    ///
    /// A `bash` call is rejected up front unless its command starts with one
    /// of the prefixes, or contains one after a space, pipe, or `&`.
    pub async fn execute_filtered(
        &self,
        name: &str,
        args: Value,
        ctx: &ToolContext,
        bash_prefixes: &[String],
    ) -> ToolResult {
        if name == "bash" && !bash_prefixes.is_empty() {
            let command = args
                .get("command")
                .and_then(Value::as_str)
                .unwrap_or_default();
            if !command_matches_prefixes(command, bash_prefixes) {
                return ToolResult::fail(format!(
                    "Command not allowed in read-only mode: {command}"
                ));
            }
        }
        self.execute(name, args, ctx).await
    }
}

fn command_matches_prefixes(command: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|p| {
        command.starts_with(p.as_str())
            || command.contains(&format!(" {p}"))
            || command.contains(&format!("|{p}"))
            || command.contains(&format!("&{p}"))
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
