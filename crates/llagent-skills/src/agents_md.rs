//! AGENTS.md discovery (agents.md spec).
//!
//! Walks from the working directory up to the git root collecting AGENTS.md
//! files (closest first), then appends a global fallback from the config
//! directory with lowest precedence. Produces a `<project_context>` prompt
//! section.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::xml::escape;

/// Combined size above which a warning is logged.
pub const SIZE_WARN_THRESHOLD: usize = 50 * 1024;

const MAX_WALK_DEPTH: usize = 100;

/// One discovered AGENTS.md file.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentsMdFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the git root, or a marker for the global file.
    pub relative_path: String,
    /// File contents.
    pub content: String,
    /// Distance from the working directory (0 = closest).
    pub depth: usize,
}

/// Find the nearest ancestor containing `.git`.
#[must_use]
pub fn find_git_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir
        .canonicalize()
        .unwrap_or_else(|_| start_dir.to_path_buf());
    loop {
        if current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

fn read_text_file(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let check_len = bytes.len().min(8192);
    if bytes[..check_len].contains(&0) {
        return None; // binary
    }
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Discovers and holds AGENTS.md files for one session.
#[derive(Debug, Default)]
pub struct AgentsMdManager {
    files: Vec<AgentsMdFile>,
}

impl AgentsMdManager {
    /// Empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk up from `working_dir` to the git root; then check
    /// `config_dir/AGENTS.md` as the global fallback. Returns the number of
    /// files found.
    pub fn discover(&mut self, working_dir: &Path, config_dir: Option<&Path>) -> usize {
        self.files.clear();

        let start = working_dir
            .canonicalize()
            .unwrap_or_else(|_| working_dir.to_path_buf());
        let git_root = find_git_root(&start);
        let stop_at = git_root.clone().unwrap_or_else(|| start.clone());

        let mut current = start;
        let mut depth = 0;
        while depth < MAX_WALK_DEPTH {
            let candidate = current.join("AGENTS.md");
            if candidate.is_file() {
                if let Some(content) = read_text_file(&candidate) {
                    if !content.is_empty() {
                        let relative_path = git_root
                            .as_ref()
                            .and_then(|root| candidate.strip_prefix(root).ok())
                            .map_or_else(
                                || "AGENTS.md".to_owned(),
                                |p| p.to_string_lossy().into_owned(),
                            );
                        self.files.push(AgentsMdFile {
                            path: candidate.clone(),
                            relative_path,
                            content,
                            depth,
                        });
                    }
                }
            }

            if current == stop_at || !current.pop() {
                break;
            }
            depth += 1;
        }

        if let Some(config_dir) = config_dir {
            let global = config_dir.join("AGENTS.md");
            if global.is_file() {
                if let Some(content) = read_text_file(&global) {
                    if !content.is_empty() {
                        self.files.push(AgentsMdFile {
                            path: global,
                            relative_path: "(global)".to_owned(),
                            content,
                            depth: depth + 1,
                        });
                    }
                }
            }
        }

        let total = self.total_content_size();
        if total > SIZE_WARN_THRESHOLD {
            warn!(
                total_bytes = total,
                threshold = SIZE_WARN_THRESHOLD,
                "AGENTS.md content is large; consider trimming"
            );
        }

        self.files.len()
    }

    /// The discovered files, closest first, global last.
    #[must_use]
    pub fn files(&self) -> &[AgentsMdFile] {
        &self.files
    }

    /// Combined content size in bytes.
    #[must_use]
    pub fn total_content_size(&self) -> usize {
        self.files.iter().map(|f| f.content.len()).sum()
    }

    /// `<project_context>` prompt section; empty when nothing was found.
    #[must_use]
    pub fn prompt_section(&self) -> String {
        if self.files.is_empty() {
            return String::new();
        }

        let mut xml = String::from("<project_context>\n");
        xml.push_str(
            "Project guidance from AGENTS.md files (closest to working directory takes precedence):\n\n",
        );
        for file in &self.files {
            xml.push_str(&format!("<agents_md path=\"{}\"", escape(&file.relative_path)));
            if file.depth == 0 {
                xml.push_str(" precedence=\"highest\"");
            }
            xml.push_str(">\n");
            xml.push_str(&file.content);
            if !file.content.ends_with('\n') {
                xml.push('\n');
            }
            xml.push_str("</agents_md>\n\n");
        }
        xml.push_str("</project_context>");
        xml
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_repo(root: &Path) {
        std::fs::create_dir_all(root.join(".git")).unwrap();
    }

    #[test]
    fn finds_git_root_upwards() {
        let tmp = tempfile::tempdir().unwrap();
        make_repo(tmp.path());
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        let root = find_git_root(&nested).unwrap();
        assert_eq!(root, tmp.path().canonicalize().unwrap());
    }

    #[test]
    fn discover_collects_closest_first() {
        let tmp = tempfile::tempdir().unwrap();
        make_repo(tmp.path());
        let nested = tmp.path().join("src/module");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(tmp.path().join("AGENTS.md"), "root guidance\n").unwrap();
        std::fs::write(nested.join("AGENTS.md"), "module guidance\n").unwrap();

        let mut manager = AgentsMdManager::new();
        assert_eq!(manager.discover(&nested, None), 2);

        let files = manager.files();
        assert_eq!(files[0].content, "module guidance\n");
        assert_eq!(files[0].depth, 0);
        assert_eq!(files[0].relative_path, "src/module/AGENTS.md");
        assert_eq!(files[1].content, "root guidance\n");
        assert_eq!(files[1].relative_path, "AGENTS.md");
    }

    #[test]
    fn discover_stops_at_git_root() {
        let outer = tempfile::tempdir().unwrap();
        std::fs::write(outer.path().join("AGENTS.md"), "outside the repo\n").unwrap();
        let repo = outer.path().join("repo");
        make_repo(&repo);
        std::fs::create_dir_all(repo.join("src")).unwrap();

        let mut manager = AgentsMdManager::new();
        let _ = manager.discover(&repo.join("src"), None);
        assert!(manager
            .files()
            .iter()
            .all(|f| f.content != "outside the repo\n"));
    }

    #[test]
    fn global_fallback_has_lowest_precedence() {
        let tmp = tempfile::tempdir().unwrap();
        make_repo(tmp.path());
        std::fs::write(tmp.path().join("AGENTS.md"), "project\n").unwrap();
        let config = tempfile::tempdir().unwrap();
        std::fs::write(config.path().join("AGENTS.md"), "global\n").unwrap();

        let mut manager = AgentsMdManager::new();
        assert_eq!(manager.discover(tmp.path(), Some(config.path())), 2);
        let files = manager.files();
        assert_eq!(files.last().unwrap().relative_path, "(global)");
        assert_eq!(files.last().unwrap().content, "global\n");
    }

    #[test]
    fn binary_and_empty_files_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        make_repo(tmp.path());
        std::fs::write(tmp.path().join("AGENTS.md"), b"bin\0ary").unwrap();

        let mut manager = AgentsMdManager::new();
        assert_eq!(manager.discover(tmp.path(), None), 0);
    }

    #[test]
    fn prompt_section_marks_highest_precedence() {
        let tmp = tempfile::tempdir().unwrap();
        make_repo(tmp.path());
        std::fs::write(tmp.path().join("AGENTS.md"), "Use tabs").unwrap();

        let mut manager = AgentsMdManager::new();
        let _ = manager.discover(tmp.path(), None);
        let xml = manager.prompt_section();
        assert!(xml.starts_with("<project_context>\n"));
        assert!(xml.contains("precedence=\"highest\""));
        assert!(xml.contains("Use tabs\n"));
        assert!(xml.ends_with("</project_context>"));
    }

    #[test]
    fn prompt_section_empty_without_files() {
        assert!(AgentsMdManager::new().prompt_section().is_empty());
    }

    #[test]
    fn total_size_sums_contents() {
        let tmp = tempfile::tempdir().unwrap();
        make_repo(tmp.path());
        std::fs::write(tmp.path().join("AGENTS.md"), "12345").unwrap();
        let mut manager = AgentsMdManager::new();
        let _ = manager.discover(tmp.path(), None);
        assert_eq!(manager.total_content_size(), 5);
    }
}
