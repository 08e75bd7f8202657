//! `mcp.json` loading.
//!
//! Looked up in the working directory first, then `~/.llama-agent/`.
//! String values may reference `${VAR}`, resolved from the process
//! environment (unset variables expand to the empty string).

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::McpError;

fn env_var_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var regex"))
}

/// One server declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct McpServerConfig {
    /// Executable to spawn.
    pub command: String,
    /// Arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Whether to start this server (default true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Per-call timeout in milliseconds (default 60000).
    #[serde(default = "default_timeout", rename = "timeout")]
    pub timeout_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_timeout() -> u64 {
    60_000
}

/// The whole `mcp.json` document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct McpConfig {
    /// Declared servers by name.
    #[serde(default)]
    pub servers: BTreeMap<String, McpServerConfig>,
}

/// Expand `${VAR}` references from the process environment.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    env_var_re()
        .replace_all(value, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// Parse a config file, applying env expansion to command, args, and env
/// values.
pub fn load_config(path: &Path) -> Result<McpConfig, McpError> {
    let raw = std::fs::read_to_string(path)?;
    let mut config: McpConfig = serde_json::from_str(&raw).map_err(|e| McpError::Config {
        message: format!("invalid mcp.json: {e}"),
    })?;

    for server in config.servers.values_mut() {
        server.command = expand_env_vars(&server.command);
        for arg in &mut server.args {
            *arg = expand_env_vars(arg);
        }
        for value in server.env.values_mut() {
            *value = expand_env_vars(value);
        }
    }

    Ok(config)
}

/// Locate `mcp.json`: working directory first, then `~/.llama-agent/`.
#[must_use]
pub fn find_config(working_dir: &Path) -> Option<PathBuf> {
    let local = working_dir.join("mcp.json");
    if local.exists() {
        return Some(local);
    }
    let home = std::env::var("HOME").ok()?;
    let global = Path::new(&home).join(".llama-agent").join("mcp.json");
    global.exists().then_some(global)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mcp.json");
        std::fs::write(
            &path,
            r#"{"servers": {"files": {"command": "mcp-files"}}}"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        let server = &config.servers["files"];
        assert_eq!(server.command, "mcp-files");
        assert!(server.args.is_empty());
        assert!(server.enabled);
        assert_eq!(server.timeout_ms, 60_000);
    }

    #[test]
    fn parses_full_server_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mcp.json");
        std::fs::write(
            &path,
            r#"{"servers": {"db": {
                "command": "mcp-db",
                "args": ["--port", "5432"],
                "env": {"DB_NAME": "test"},
                "enabled": false,
                "timeout": 5000
            }}}"#,
        )
        .unwrap();

        let server = &load_config(&path).unwrap().servers["db"];
        assert_eq!(server.args, vec!["--port", "5432"]);
        assert_eq!(server.env["DB_NAME"], "test");
        assert!(!server.enabled);
        assert_eq!(server.timeout_ms, 5000);
    }

    #[test]
    fn invalid_json_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mcp.json");
        std::fs::write(&path, "not json").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, McpError::Config { .. }));
    }

    #[test]
    fn env_vars_expand() {
        std::env::set_var("LLAGENT_TEST_MCP_VAR", "expanded");
        assert_eq!(
            expand_env_vars("prefix-${LLAGENT_TEST_MCP_VAR}-suffix"),
            "prefix-expanded-suffix"
        );
        assert_eq!(expand_env_vars("${LLAGENT_TEST_MCP_UNSET_VAR}"), "");
        assert_eq!(expand_env_vars("no refs"), "no refs");
    }

    #[test]
    fn env_vars_expand_inside_config_values() {
        std::env::set_var("LLAGENT_TEST_MCP_TOKEN", "s3cr3t");
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mcp.json");
        std::fs::write(
            &path,
            r#"{"servers": {"api": {
                "command": "mcp-api",
                "args": ["--token", "${LLAGENT_TEST_MCP_TOKEN}"],
                "env": {"API_TOKEN": "${LLAGENT_TEST_MCP_TOKEN}"}
            }}}"#,
        )
        .unwrap();

        let server = &load_config(&path).unwrap().servers["api"];
        assert_eq!(server.args[1], "s3cr3t");
        assert_eq!(server.env["API_TOKEN"], "s3cr3t");
    }

    #[test]
    fn find_config_prefers_working_dir() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("mcp.json"), "{}").unwrap();
        assert_eq!(
            find_config(tmp.path()),
            Some(tmp.path().join("mcp.json"))
        );
    }

    #[test]
    fn find_config_missing_everywhere() {
        let tmp = tempfile::tempdir().unwrap();
        let prev_home = std::env::var("HOME").ok();
        std::env::set_var("HOME", tmp.path());
        assert_eq!(find_config(tmp.path()), None);
        if let Some(home) = prev_home {
            std::env::set_var("HOME", home);
        }
    }
}
