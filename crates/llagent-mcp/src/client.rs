//! MCP client: request/response over a stdio transport.
//!
//! Requests are serialized (one in flight per server); unsolicited
//! server-initiated messages are skipped while waiting for the matching id.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::McpServerConfig;
use crate::protocol::{
    CallToolResult, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, McpToolDef,
    ToolsListResult, PROTOCOL_VERSION,
};
use crate::transport::StdioTransport;
use crate::McpError;

const INIT_TIMEOUT_MS: u64 = 30_000;

/// Client for one MCP server.
pub struct McpClient {
    name: String,
    transport: StdioTransport,
    next_id: AtomicI64,
}

impl McpClient {
    /// Spawn and wrap the server process (no handshake yet).
    pub async fn connect(
        name: &str,
        config: &McpServerConfig,
        working_dir: &Path,
    ) -> Result<Self, McpError> {
        let transport =
            StdioTransport::spawn(&config.command, &config.args, &config.env, working_dir).await?;
        Ok(Self {
            name: name.to_owned(),
            transport,
            next_id: AtomicI64::new(1),
        })
    }

    /// Server name from the config.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout_ms: u64,
    ) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        self.transport.send(&serde_json::to_string(&request)?).await?;

        let deadline = tokio::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
        loop {
            let line = tokio::time::timeout_at(deadline, self.transport.receive())
                .await
                .map_err(|_| McpError::Timeout { timeout_ms })??;

            let response: JsonRpcResponse = match serde_json::from_str(&line) {
                Ok(r) => r,
                Err(e) => {
                    debug!(server = %self.name, error = %e, "skipping unparseable line");
                    continue;
                }
            };
            if response.id != Some(id) {
                continue; // server-initiated message or stale reply
            }
            if let Some(error) = response.error {
                return Err(McpError::Server {
                    server: self.name.clone(),
                    message: format!("{} (code {})", error.message, error.code),
                });
            }
            return Ok(response.result.unwrap_or(Value::Null));
        }
    }

    /// Perform the `initialize` handshake and emit `notifications/initialized`.
    pub async fn initialize(&self) -> Result<Value, McpError> {
        info!(server = %self.name, "initializing MCP connection");
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "llama-agent",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let result = self
            .request("initialize", Some(params), INIT_TIMEOUT_MS)
            .await?;

        let initialized = JsonRpcNotification {
            jsonrpc: "2.0",
            method: "notifications/initialized".into(),
            params: None,
        };
        self.transport
            .send(&serde_json::to_string(&initialized)?)
            .await?;

        Ok(result)
    }

    /// Fetch the server's tool list.
    pub async fn list_tools(&self, timeout_ms: u64) -> Result<Vec<McpToolDef>, McpError> {
        let result = self.request("tools/list", None, timeout_ms).await?;
        let parsed: ToolsListResult = serde_json::from_value(result)?;
        Ok(parsed.tools)
    }

    /// Call one tool.
    pub async fn call_tool(
        &self,
        tool: &str,
        arguments: Value,
        timeout_ms: u64,
    ) -> Result<CallToolResult, McpError> {
        let params = json!({"name": tool, "arguments": arguments});
        let result = self.request("tools/call", Some(params), timeout_ms).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Whether the server process is alive.
    pub async fn is_connected(&self) -> bool {
        self.transport.is_alive().await
    }

    /// Kill the server process.
    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn script_config(script: &str) -> McpServerConfig {
        McpServerConfig {
            command: "sh".into(),
            args: vec!["-c".into(), script.into()],
            env: HashMap::new(),
            enabled: true,
            timeout_ms: 60_000,
        }
    }

    #[tokio::test]
    async fn request_correlates_by_id() {
        // First client request gets id 1; the script answers it after a
        // decoy notification.
        let script = r#"read line; echo '{"jsonrpc":"2.0","method":"noise","params":{}}'; echo '{"jsonrpc":"2.0","id":1,"result":{"ok":true}}'; sleep 1"#;
        let client = McpClient::connect("test", &script_config(script), Path::new("/tmp"))
            .await
            .unwrap();
        let result = client.request("ping", None, 5_000).await.unwrap();
        assert_eq!(result["ok"], true);
    }

    #[tokio::test]
    async fn error_response_surfaces_as_server_error() {
        let script = r#"read line; echo '{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"nope"}}'; sleep 1"#;
        let client = McpClient::connect("errsrv", &script_config(script), Path::new("/tmp"))
            .await
            .unwrap();
        let err = client.request("missing", None, 5_000).await.unwrap_err();
        match err {
            McpError::Server { server, message } => {
                assert_eq!(server, "errsrv");
                assert!(message.contains("nope"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let client = McpClient::connect(
            "quiet",
            &script_config("read line; sleep 10"),
            Path::new("/tmp"),
        )
        .await
        .unwrap();
        let err = client.request("ping", None, 100).await.unwrap_err();
        assert!(matches!(err, McpError::Timeout { timeout_ms: 100 }));
    }

    #[tokio::test]
    async fn list_tools_parses_definitions() {
        let script = r#"read line; echo '{"jsonrpc":"2.0","id":1,"result":{"tools":[{"name":"search","description":"Find things"}]}}'; sleep 1"#;
        let client = McpClient::connect("toolsrv", &script_config(script), Path::new("/tmp"))
            .await
            .unwrap();
        let tools = client.list_tools(5_000).await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "search");
        assert_eq!(tools[0].description, "Find things");
    }

    #[tokio::test]
    async fn call_tool_parses_content() {
        let script = r#"read line; echo '{"jsonrpc":"2.0","id":1,"result":{"content":[{"type":"text","text":"answer"}]}}'; sleep 1"#;
        let client = McpClient::connect("callsrv", &script_config(script), Path::new("/tmp"))
            .await
            .unwrap();
        let result = client
            .call_tool("search", json!({"q": "x"}), 5_000)
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(
            crate::protocol::flatten_content(&result.content),
            "answer"
        );
    }
}
