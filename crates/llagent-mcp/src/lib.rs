//! MCP (Model Context Protocol) integration.
//!
//! External tool servers are declared in `mcp.json`, spawned over stdio
//! (newline-delimited JSON-RPC 2.0), and their tools registered into the
//! tool registry under `mcp__<server>__<tool>` names. Reply content arrays
//! flatten into concatenated text output.

pub mod client;
pub mod config;
pub mod manager;
pub mod protocol;
pub mod tool;
pub mod transport;

pub use client::McpClient;
pub use config::{expand_env_vars, find_config, load_config, McpConfig, McpServerConfig};
pub use manager::{parse_qualified_name, qualify_name, McpManager};
pub use tool::McpTool;

/// Errors from MCP configuration and transport.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Bad or missing configuration.
    #[error("config error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// I/O failure talking to a server process.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server returned a JSON-RPC error.
    #[error("server '{server}' error: {message}")]
    Server {
        /// Server name.
        server: String,
        /// Error description.
        message: String,
    },

    /// No reply within the deadline.
    #[error("timeout after {timeout_ms}ms")]
    Timeout {
        /// The deadline that elapsed.
        timeout_ms: u64,
    },

    /// Protocol-shape violation.
    #[error("{message}")]
    Protocol {
        /// Description of the violation.
        message: String,
    },
}
