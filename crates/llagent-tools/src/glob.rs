//! `glob` tool — find files by shell glob pattern.
//!
//! Globs convert to anchored regexes: `*` matches within one path segment,
//! `**` crosses segments, `?` is one non-separator character, `[…]` classes
//! pass through, and regex metacharacters are escaped. The walk skips
//! permission-denied branches; results sort by modification time descending
//! and cap at 100.

use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use regex::RegexBuilder;
use serde_json::{json, Value};

use llagent_core::{ToolResult, ToolSchema};

use crate::traits::{AgentTool, ToolContext, ToolError};
use crate::util::{optional_str, required_str, resolve_path};

const RESULT_LIMIT: usize = 100;

/// The `glob` tool.
pub struct GlobTool;

/// Convert a shell glob to a regex body (unanchored).
#[must_use]
pub fn glob_to_regex(pattern: &str) -> String {
    let mut regex = String::new();
    let mut in_bracket = false;
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if in_bracket {
            match c {
                ']' => {
                    in_bracket = false;
                    regex.push(c);
                }
                '\\' => regex.push_str("\\\\"),
                _ => regex.push(c),
            }
            continue;
        }
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    let _ = chars.next();
                    regex.push_str(".*");
                } else {
                    regex.push_str("[^/]*");
                }
            }
            '?' => regex.push_str("[^/]"),
            '[' => {
                in_bracket = true;
                regex.push(c);
            }
            '.' | '(' | ')' | '+' | '|' | '^' | '$' | '{' | '}' | '\\' => {
                regex.push('\\');
                regex.push(c);
            }
            _ => regex.push(c),
        }
    }
    regex
}

#[async_trait]
impl AgentTool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "glob".into(),
            description: "Find files matching a glob pattern. Supports * (any characters except /), ** (any path), ? (single character), [abc] (character class). Results are sorted by modification time (most recent first).".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "pattern": {
                        "type": "string",
                        "description": "Glob pattern to match (e.g., '*.cpp', 'src/**/*.ts', 'test_*.py')"
                    },
                    "path": {
                        "type": "string",
                        "description": "Directory to search in (default: working directory)"
                    }
                },
                "required": ["pattern"]
            }),
        }
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let pattern = match required_str(&args, "pattern") {
            Ok(p) => p,
            Err(failure) => return Ok(failure),
        };
        let search_path = {
            let raw = optional_str(&args, "path");
            if raw.is_empty() {
                ctx.working_dir.clone()
            } else {
                resolve_path(&raw, &ctx.working_dir)
            }
        };

        if !search_path.exists() {
            return Ok(ToolResult::fail(format!(
                "Directory not found: {}",
                search_path.display()
            )));
        }
        if !search_path.is_dir() {
            return Ok(ToolResult::fail(format!(
                "Not a directory: {}",
                search_path.display()
            )));
        }

        let regex = match RegexBuilder::new(&format!("^(?:{})$", glob_to_regex(&pattern)))
            .case_insensitive(true)
            .build()
        {
            Ok(r) => r,
            Err(e) => return Ok(ToolResult::fail(format!("Invalid pattern: {e}"))),
        };

        // Match against the base-relative path when the pattern spans
        // directories, otherwise against the basename.
        let match_full_path = pattern.contains('/') || pattern.contains("**");

        let mut matches: Vec<(PathBuf, SystemTime)> = Vec::new();
        for entry in walkdir::WalkDir::new(&search_path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let target = if match_full_path {
                entry
                    .path()
                    .strip_prefix(&search_path)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .into_owned()
            } else {
                entry.file_name().to_string_lossy().into_owned()
            };
            if regex.is_match(&target) {
                let mtime = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                matches.push((entry.path().to_path_buf(), mtime));
                if matches.len() >= RESULT_LIMIT {
                    break;
                }
            }
        }

        if matches.is_empty() {
            return Ok(ToolResult::ok(format!(
                "No files found matching pattern: {pattern}"
            )));
        }

        matches.sort_by(|a, b| b.1.cmp(&a.1));

        let mut output = String::new();
        for (path, _) in &matches {
            let relative = path.strip_prefix(&search_path).unwrap_or(path);
            output.push_str(&relative.to_string_lossy());
            output.push('\n');
        }

        if matches.len() >= RESULT_LIMIT {
            output.push_str(&format!(
                "\n[Results limited to {RESULT_LIMIT} files. Use a more specific pattern.]"
            ));
        } else {
            output.push_str(&format!("\n[{} file(s) found]", matches.len()));
        }

        Ok(ToolResult::ok(output))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::path::Path;
    use std::time::Duration;

    fn ctx_in(dir: &Path) -> ToolContext {
        ToolContext::new(dir, 120_000)
    }

    async fn glob(dir: &Path, args: Value) -> ToolResult {
        GlobTool.execute(args, &ctx_in(dir)).await.unwrap()
    }

    #[test]
    fn star_stays_within_segment() {
        assert_eq!(glob_to_regex("*.rs"), "[^/]*\\.rs");
    }

    #[test]
    fn double_star_crosses_segments() {
        assert_eq!(glob_to_regex("**/*.md"), ".*/[^/]*\\.md");
    }

    #[test]
    fn question_mark_is_single_non_separator() {
        assert_eq!(glob_to_regex("a?.txt"), "a[^/]\\.txt");
    }

    #[test]
    fn character_class_preserved() {
        assert_eq!(glob_to_regex("[abc]*.rs"), "[abc][^/]*\\.rs");
    }

    #[test]
    fn metacharacters_escaped() {
        assert_eq!(glob_to_regex("a+b(c)|d"), "a\\+b\\(c\\)\\|d");
        assert_eq!(glob_to_regex("x{1}$"), "x\\{1\\}\\$");
    }

    #[tokio::test]
    async fn basename_match_for_flat_pattern() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("top.rs"), "").unwrap();
        std::fs::write(dir.path().join("sub/deep.rs"), "").unwrap();
        std::fs::write(dir.path().join("other.txt"), "").unwrap();

        let r = glob(dir.path(), json!({"pattern": "*.rs"})).await;
        assert!(r.success);
        // Flat patterns match basenames anywhere in the tree.
        assert!(r.output.contains("top.rs"));
        assert!(r.output.contains("deep.rs"));
        assert!(!r.output.contains("other.txt"));
        assert!(r.output.contains("[2 file(s) found]"));
    }

    #[tokio::test]
    async fn double_star_matches_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/guides")).unwrap();
        std::fs::write(dir.path().join("docs/guides/setup.md"), "").unwrap();
        std::fs::write(dir.path().join("docs/notes.md"), "").unwrap();

        let r = glob(dir.path(), json!({"pattern": "**/*.md"})).await;
        assert!(r.output.contains("docs/guides/setup.md"));
        assert!(r.output.contains("docs/notes.md"));
    }

    #[tokio::test]
    async fn no_matches_message() {
        let dir = tempfile::tempdir().unwrap();
        let r = glob(dir.path(), json!({"pattern": "*.zig"})).await;
        assert!(r.success);
        assert_eq!(r.output, "No files found matching pattern: *.zig");
    }

    #[tokio::test]
    async fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let r = glob(
            dir.path(),
            json!({"pattern": "*.rs", "path": "does-not-exist"}),
        )
        .await;
        assert!(!r.success);
        assert!(r.error.starts_with("Directory not found: "));
    }

    #[tokio::test]
    async fn results_sorted_by_mtime_descending() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.rs");
        let new = dir.path().join("new.rs");
        std::fs::write(&old, "").unwrap();
        std::fs::write(&new, "").unwrap();

        let now = SystemTime::now();
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(now - Duration::from_secs(3600))
            .unwrap();
        File::options()
            .write(true)
            .open(&new)
            .unwrap()
            .set_modified(now)
            .unwrap();

        let r = glob(dir.path(), json!({"pattern": "*.rs"})).await;
        let new_pos = r.output.find("new.rs").unwrap();
        let old_pos = r.output.find("old.rs").unwrap();
        assert!(new_pos < old_pos, "most recent file first:\n{}", r.output);
    }

    #[tokio::test]
    async fn capped_at_one_hundred_with_note() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..150 {
            std::fs::write(dir.path().join(format!("f{i:03}.md")), "").unwrap();
        }
        let r = glob(dir.path(), json!({"pattern": "*.md"})).await;
        let paths: Vec<&str> = r
            .output
            .lines()
            .take_while(|l| !l.is_empty())
            .collect();
        assert_eq!(paths.len(), 100);
        assert!(r
            .output
            .ends_with("[Results limited to 100 files. Use a more specific pattern.]"));
    }

    #[tokio::test]
    async fn missing_pattern_param() {
        let dir = tempfile::tempdir().unwrap();
        let r = glob(dir.path(), json!({})).await;
        assert!(!r.success);
        assert_eq!(r.error, "pattern parameter is required");
    }

    #[tokio::test]
    async fn case_insensitive_matching() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README.MD"), "").unwrap();
        let r = glob(dir.path(), json!({"pattern": "*.md"})).await;
        assert!(r.output.contains("README.MD"));
    }
}
