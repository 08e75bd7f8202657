//! Shared parameter and path helpers for the built-in tools.

use std::path::{Path, PathBuf};

use serde_json::Value;

use llagent_core::ToolResult;

/// Resolve a file path against the working directory. Absolute paths pass
/// through unchanged.
#[must_use]
pub fn resolve_path(file_path: &str, working_dir: &Path) -> PathBuf {
    let path = Path::new(file_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}

/// Fetch a required non-empty string parameter, or the failure result the
/// tool should return.
pub fn required_str(args: &Value, key: &str) -> Result<String, ToolResult> {
    match args.get(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s.to_owned()),
        _ => Err(ToolResult::fail(format!("{key} parameter is required"))),
    }
}

/// Optional string parameter (empty default).
#[must_use]
pub fn optional_str(args: &Value, key: &str) -> String {
    args.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Optional unsigned integer parameter.
#[must_use]
pub fn optional_u64(args: &Value, key: &str) -> Option<u64> {
    args.get(key).and_then(Value::as_u64)
}

/// Optional boolean parameter (false default).
#[must_use]
pub fn optional_bool(args: &Value, key: &str) -> bool {
    args.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Truncate a string at a char boundary no later than `max_bytes`.
#[must_use]
pub fn truncate_at_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolve_absolute_unchanged() {
        assert_eq!(
            resolve_path("/usr/bin/ls", Path::new("/home/user")),
            PathBuf::from("/usr/bin/ls")
        );
    }

    #[test]
    fn resolve_relative_joined() {
        assert_eq!(
            resolve_path("src/main.rs", Path::new("/proj")),
            PathBuf::from("/proj/src/main.rs")
        );
    }

    #[test]
    fn required_str_present() {
        let args = json!({"command": "ls"});
        assert_eq!(required_str(&args, "command").unwrap(), "ls");
    }

    #[test]
    fn required_str_missing_or_empty() {
        let err = required_str(&json!({}), "command").unwrap_err();
        assert!(!err.success);
        assert_eq!(err.error, "command parameter is required");

        let err = required_str(&json!({"command": ""}), "command").unwrap_err();
        assert_eq!(err.error, "command parameter is required");
    }

    #[test]
    fn optional_accessors() {
        let args = json!({"offset": 5, "replace_all": true, "path": "x"});
        assert_eq!(optional_u64(&args, "offset"), Some(5));
        assert_eq!(optional_u64(&args, "missing"), None);
        assert!(optional_bool(&args, "replace_all"));
        assert!(!optional_bool(&args, "missing"));
        assert_eq!(optional_str(&args, "path"), "x");
        assert_eq!(optional_str(&args, "missing"), "");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "héllo";
        // Byte 2 falls inside 'é'.
        assert_eq!(truncate_at_boundary(s, 2), "h");
        assert_eq!(truncate_at_boundary(s, 3), "hé");
        assert_eq!(truncate_at_boundary(s, 100), "héllo");
    }
}
