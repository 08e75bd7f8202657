//! MCP server lifecycle and tool-name qualification.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use llagent_tools::ToolRegistry;

use crate::client::McpClient;
use crate::config::{load_config, McpConfig, McpServerConfig};
use crate::tool::McpTool;
use crate::McpError;

/// Build the registry name for a server tool: `mcp__<server>__<tool>`.
/// Double underscores inside either part collapse to single so the
/// separator stays unambiguous.
#[must_use]
pub fn qualify_name(server: &str, tool: &str) -> String {
    let mut safe_server = server.to_owned();
    while safe_server.contains("__") {
        safe_server = safe_server.replace("__", "_");
    }
    let mut safe_tool = tool.to_owned();
    while safe_tool.contains("__") {
        safe_tool = safe_tool.replace("__", "_");
    }
    format!("mcp__{safe_server}__{safe_tool}")
}

/// Split a qualified name back into `(server, tool)`.
#[must_use]
pub fn parse_qualified_name(qualified: &str) -> Option<(String, String)> {
    let rest = qualified.strip_prefix("mcp__")?;
    let sep = rest.find("__")?;
    let server = &rest[..sep];
    let tool = &rest[sep + 2..];
    if server.is_empty() || tool.is_empty() {
        return None;
    }
    Some((server.to_owned(), tool.to_owned()))
}

/// Owns the configured servers and their connected clients.
#[derive(Default)]
pub struct McpManager {
    configs: BTreeMap<String, McpServerConfig>,
    clients: HashMap<String, Arc<McpClient>>,
    working_dir: PathBuf,
}

impl McpManager {
    /// Manager rooted at the given working directory.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            ..Default::default()
        }
    }

    /// Load a config file into the manager.
    pub fn load(&mut self, path: &Path) -> Result<(), McpError> {
        let McpConfig { servers } = load_config(path)?;
        self.configs = servers;
        Ok(())
    }

    /// Configured server names.
    #[must_use]
    pub fn server_names(&self) -> Vec<String> {
        self.configs.keys().cloned().collect()
    }

    /// Spawn and initialize every enabled server. Returns how many came up;
    /// individual failures are logged and skipped.
    pub async fn start_servers(&mut self) -> usize {
        let mut started = 0;
        for (name, config) in &self.configs {
            if !config.enabled {
                continue;
            }
            match McpClient::connect(name, config, &self.working_dir).await {
                Ok(client) => match client.initialize().await {
                    Ok(_) => {
                        info!(server = %name, "MCP server started");
                        let _ = self.clients.insert(name.clone(), Arc::new(client));
                        started += 1;
                    }
                    Err(e) => warn!(server = %name, error = %e, "MCP initialize failed"),
                },
                Err(e) => warn!(server = %name, error = %e, "MCP spawn failed"),
            }
        }
        started
    }

    /// Whether a server is connected.
    pub async fn is_server_connected(&self, name: &str) -> bool {
        match self.clients.get(name) {
            Some(client) => client.is_connected().await,
            None => false,
        }
    }

    /// Register every connected server's tools into the registry under
    /// qualified names. Returns how many tools were registered.
    pub async fn register_tools(&self, registry: &mut ToolRegistry) -> usize {
        let mut registered = 0;
        for (name, client) in &self.clients {
            let timeout_ms = self
                .configs
                .get(name)
                .map_or(60_000, |c| c.timeout_ms);
            match client.list_tools(timeout_ms).await {
                Ok(tools) => {
                    for def in tools {
                        let qualified = qualify_name(name, &def.name);
                        registry.register(Arc::new(McpTool::new(
                            qualified,
                            def,
                            client.clone(),
                            timeout_ms,
                        )));
                        registered += 1;
                    }
                }
                Err(e) => warn!(server = %name, error = %e, "tools/list failed"),
            }
        }
        registered
    }

    /// Shut every server down.
    pub async fn shutdown_all(&mut self) {
        for client in self.clients.values() {
            client.shutdown().await;
        }
        self.clients.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
