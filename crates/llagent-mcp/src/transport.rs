//! Stdio transport: newline-delimited JSON to/from a child process.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::McpError;

/// A spawned MCP server process with line-framed stdio.
#[derive(Debug)]
pub struct StdioTransport {
    stdin: Mutex<ChildStdin>,
    stdout: Mutex<BufReader<ChildStdout>>,
    child: Mutex<Child>,
}

impl StdioTransport {
    /// Spawn the server process.
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        working_dir: &Path,
    ) -> Result<Self, McpError> {
        info!(command, ?args, "spawning MCP server");

        let mut cmd = Command::new(command);
        let _ = cmd
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .current_dir(working_dir)
            .kill_on_drop(true);
        for (key, value) in env {
            let _ = cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                McpError::Config {
                    message: format!("Command not found: {command}. Is it installed and in PATH?"),
                }
            } else {
                McpError::Io(e)
            }
        })?;

        let stdin = child.stdin.take().ok_or_else(|| McpError::Protocol {
            message: "server has no stdin".into(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| McpError::Protocol {
            message: "server has no stdout".into(),
        })?;

        Ok(Self {
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            child: Mutex::new(child),
        })
    }

    /// Send one JSON message followed by a newline.
    pub async fn send(&self, message: &str) -> Result<(), McpError> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(message.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        debug!(message, "mcp sent");
        Ok(())
    }

    /// Receive the next JSON line, skipping any non-JSON noise the server
    /// prints.
    pub async fn receive(&self) -> Result<String, McpError> {
        let mut stdout = self.stdout.lock().await;
        loop {
            let mut line = String::new();
            let bytes = stdout.read_line(&mut line).await?;
            if bytes == 0 {
                return Err(McpError::Protocol {
                    message: "MCP server closed stdout".into(),
                });
            }
            let line = line.trim();
            if line.starts_with('{') {
                debug!(line, "mcp received");
                return Ok(line.to_owned());
            }
        }
    }

    /// Whether the child is still running.
    pub async fn is_alive(&self) -> bool {
        let mut child = self.child.lock().await;
        matches!(child.try_wait(), Ok(None))
    }

    /// Kill the child process.
    pub async fn shutdown(&self) {
        let mut child = self.child.lock().await;
        let _ = child.start_kill();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
