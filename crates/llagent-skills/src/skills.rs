//! Skill discovery and SKILL.md front-matter parsing.
//!
//! A skill is a directory whose `SKILL.md` starts with `---`-delimited YAML
//! front-matter. The `name` key must match the directory name and the
//! agentskills.io naming rule. Discovery over the search paths is
//! first-wins on name collision.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::xml::escape;

const MAX_DESCRIPTION_LEN: usize = 1024;
const MAX_COMPATIBILITY_LEN: usize = 500;

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("skill name regex"))
}

/// Parsed metadata of one skill.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkillMetadata {
    /// Skill name (equals the directory name).
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Optional license string.
    pub license: String,
    /// Optional compatibility note.
    pub compatibility: String,
    /// Space-delimited tool list from `allowed-tools`.
    pub allowed_tools: Vec<String>,
    /// Nested `metadata:` map.
    pub metadata: HashMap<String, String>,
    /// Path to the SKILL.md file.
    pub path: PathBuf,
    /// Absolute skill directory.
    pub skill_dir: PathBuf,
    /// Relative script paths under `scripts/`, sorted.
    pub scripts: Vec<String>,
}

/// Validate a skill name against `^[a-z0-9]+(-[a-z0-9]+)*$` (1–64 chars).
#[must_use]
pub fn validate_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 64 && name_re().is_match(name)
}

fn trim_quotes(value: &str) -> &str {
    let v = value.trim();
    if v.len() >= 2
        && ((v.starts_with('"') && v.ends_with('"')) || (v.starts_with('\'') && v.ends_with('\'')))
    {
        &v[1..v.len() - 1]
    } else {
        v
    }
}

fn parse_yaml_line(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    let key = line[..colon].trim();
    let value = trim_quotes(&line[colon + 1..]);
    Some((key, value))
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_owned()
    }
}

/// Parse `---`-delimited front-matter into skill metadata. Returns `None`
/// on missing delimiters, missing required fields, or an invalid name.
#[must_use]
pub fn parse_frontmatter(content: &str, path: &Path) -> Option<SkillMetadata> {
    let body = content.strip_prefix("---")?;
    let end = body.find("\n---")?;
    let frontmatter = &body[..end];

    let mut skill = SkillMetadata {
        path: path.to_path_buf(),
        ..Default::default()
    };

    let mut in_metadata = false;
    for raw_line in frontmatter.lines() {
        let is_indented = raw_line.starts_with(' ') || raw_line.starts_with('\t');
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "metadata:" {
            in_metadata = true;
            continue;
        }
        if in_metadata && is_indented {
            if let Some((key, value)) = parse_yaml_line(line) {
                if !key.is_empty() && !value.is_empty() {
                    let _ = skill.metadata.insert(key.to_owned(), value.to_owned());
                }
            }
            continue;
        }
        in_metadata = false;

        let Some((key, value)) = parse_yaml_line(line) else {
            continue;
        };
        match key {
            "name" => skill.name = value.to_owned(),
            "description" => skill.description = value.to_owned(),
            "license" => skill.license = value.to_owned(),
            "compatibility" => skill.compatibility = value.to_owned(),
            "allowed-tools" => {
                skill.allowed_tools = value.split_whitespace().map(String::from).collect();
            }
            _ => {}
        }
    }

    if skill.name.is_empty() || skill.description.is_empty() || !validate_name(&skill.name) {
        return None;
    }
    skill.description = truncate_chars(&skill.description, MAX_DESCRIPTION_LEN);
    skill.compatibility = truncate_chars(&skill.compatibility, MAX_COMPATIBILITY_LEN);

    Some(skill)
}

/// Discovers and holds skills for one session.
#[derive(Debug, Default)]
pub struct SkillsManager {
    skills: Vec<SkillMetadata>,
}

impl SkillsManager {
    /// Empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one skill directory. `None` when SKILL.md is absent, invalid,
    /// or its name does not match the directory.
    #[must_use]
    pub fn parse_skill(skill_dir: &Path) -> Option<SkillMetadata> {
        let skill_path = skill_dir.join("SKILL.md");
        let content = std::fs::read_to_string(&skill_path).ok()?;
        let mut skill = parse_frontmatter(&content, &skill_path)?;

        let dir_name = skill_dir.file_name()?.to_str()?;
        if skill.name != dir_name {
            return None;
        }

        skill.skill_dir = skill_dir
            .canonicalize()
            .unwrap_or_else(|_| skill_dir.to_path_buf());

        let scripts_dir = skill_dir.join("scripts");
        if let Ok(entries) = std::fs::read_dir(&scripts_dir) {
            for entry in entries.flatten() {
                if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if !name.starts_with('.') {
                        skill.scripts.push(format!("scripts/{name}"));
                    }
                }
            }
            skill.scripts.sort();
        }

        Some(skill)
    }

    /// Scan the search paths for skill directories. First-discovered wins
    /// on name collision; the final list is sorted by name. Returns the
    /// number of skills discovered.
    pub fn discover(&mut self, search_paths: &[PathBuf]) -> usize {
        self.skills.clear();

        for search_path in search_paths {
            let Ok(entries) = std::fs::read_dir(search_path) else {
                continue;
            };
            for entry in entries.flatten() {
                if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    continue;
                }
                let dir_name = entry.file_name().to_string_lossy().into_owned();
                if dir_name.starts_with('.') {
                    continue;
                }
                if let Some(skill) = Self::parse_skill(&entry.path()) {
                    if self.skills.iter().any(|s| s.name == skill.name) {
                        debug!(name = %skill.name, "duplicate skill skipped");
                        continue;
                    }
                    self.skills.push(skill);
                }
            }
        }

        self.skills.sort_by(|a, b| a.name.cmp(&b.name));
        self.skills.len()
    }

    /// The discovered skills.
    #[must_use]
    pub fn skills(&self) -> &[SkillMetadata] {
        &self.skills
    }

    /// `<available_skills>` prompt section; empty when nothing was found.
    #[must_use]
    pub fn prompt_section(&self) -> String {
        if self.skills.is_empty() {
            return String::new();
        }

        let mut xml = String::from("<available_skills>\n");
        for skill in &self.skills {
            xml.push_str("<skill>\n");
            xml.push_str(&format!("  <name>{}</name>\n", escape(&skill.name)));
            xml.push_str(&format!(
                "  <description>{}</description>\n",
                escape(&skill.description)
            ));
            xml.push_str(&format!(
                "  <location>{}</location>\n",
                escape(&skill.path.to_string_lossy())
            ));
            xml.push_str(&format!(
                "  <skill_dir>{}</skill_dir>\n",
                escape(&skill.skill_dir.to_string_lossy())
            ));
            if !skill.scripts.is_empty() {
                xml.push_str("  <scripts>\n");
                for script in &skill.scripts {
                    xml.push_str(&format!("    <script>{}</script>\n", escape(script)));
                }
                xml.push_str("  </scripts>\n");
            }
            if !skill.allowed_tools.is_empty() {
                xml.push_str(&format!(
                    "  <allowed_tools>{}</allowed_tools>\n",
                    escape(&skill.allowed_tools.join(" "))
                ));
            }
            xml.push_str("</skill>\n");
        }
        xml.push_str("</available_skills>");
        xml
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn write_skill(base: &Path, name: &str, description: &str) -> PathBuf {
        let dir = base.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: {description}\n---\n\n# Body\n"),
        )
        .unwrap();
        dir
    }

    #[test]
    fn name_validation_matrix() {
        for valid in ["a", "code-review", "a1-b2", "x".repeat(64).as_str()] {
            assert!(validate_name(valid), "{valid}");
        }
        for invalid in [
            "",
            "-lead",
            "trail-",
            "double--hyphen",
            "UPPER",
            "has space",
            "under_score",
            "x".repeat(65).as_str(),
        ] {
            assert!(!validate_name(invalid), "{invalid:?}");
        }
    }

    #[test]
    fn frontmatter_basic_fields() {
        let content = "---\nname: my-skill\ndescription: \"Does things\"\nlicense: MIT\ncompatibility: any\nallowed-tools: read glob\n---\nbody";
        let skill = parse_frontmatter(content, Path::new("/s/SKILL.md")).unwrap();
        assert_eq!(skill.name, "my-skill");
        assert_eq!(skill.description, "Does things");
        assert_eq!(skill.license, "MIT");
        assert_eq!(skill.allowed_tools, vec!["read", "glob"]);
    }

    #[test]
    fn frontmatter_metadata_map() {
        let content = "---\nname: meta-skill\ndescription: d\nmetadata:\n  author: someone\n  version: \"2\"\n---\n";
        let skill = parse_frontmatter(content, Path::new("/s/SKILL.md")).unwrap();
        assert_eq!(skill.metadata.get("author").unwrap(), "someone");
        assert_eq!(skill.metadata.get("version").unwrap(), "2");
    }

    #[test]
    fn frontmatter_rejects_missing_fields() {
        assert!(parse_frontmatter("---\nname: x\n---\n", Path::new("/s")).is_none());
        assert!(parse_frontmatter("---\ndescription: d\n---\n", Path::new("/s")).is_none());
        assert!(parse_frontmatter("no frontmatter", Path::new("/s")).is_none());
        assert!(parse_frontmatter("---\nname: Bad Name\ndescription: d\n---\n", Path::new("/s")).is_none());
    }

    #[test]
    fn description_truncated_at_1024() {
        let content = format!(
            "---\nname: big\ndescription: {}\n---\n",
            "d".repeat(2000)
        );
        let skill = parse_frontmatter(&content, Path::new("/s")).unwrap();
        assert_eq!(skill.description.len(), 1024);
    }

    #[test]
    fn parse_skill_requires_name_dir_match() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("wrong-dir");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            "---\nname: other-name\ndescription: d\n---\n",
        )
        .unwrap();
        assert!(SkillsManager::parse_skill(&dir).is_none());
    }

    #[test]
    fn parse_skill_lists_scripts_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_skill(tmp.path(), "scripted", "has scripts");
        std::fs::create_dir(dir.join("scripts")).unwrap();
        std::fs::write(dir.join("scripts/b.py"), "").unwrap();
        std::fs::write(dir.join("scripts/a.sh"), "").unwrap();
        std::fs::write(dir.join("scripts/.hidden"), "").unwrap();

        let skill = SkillsManager::parse_skill(&dir).unwrap();
        assert_eq!(skill.scripts, vec!["scripts/a.sh", "scripts/b.py"]);
    }

    #[test]
    fn discover_first_wins_on_collision() {
        let tmp_a = tempfile::tempdir().unwrap();
        let tmp_b = tempfile::tempdir().unwrap();
        let _ = write_skill(tmp_a.path(), "shared", "from path a");
        let _ = write_skill(tmp_b.path(), "shared", "from path b");
        let _ = write_skill(tmp_b.path(), "extra", "only in b");

        let mut manager = SkillsManager::new();
        let count = manager.discover(&[tmp_a.path().to_path_buf(), tmp_b.path().to_path_buf()]);
        assert_eq!(count, 2);

        let shared = manager.skills().iter().find(|s| s.name == "shared").unwrap();
        assert_eq!(shared.description, "from path a");
    }

    #[test]
    fn discover_skips_hidden_and_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let _ = write_skill(tmp.path(), "good", "fine");
        std::fs::create_dir(tmp.path().join(".hidden")).unwrap();
        std::fs::create_dir(tmp.path().join("no-skill-md")).unwrap();

        let mut manager = SkillsManager::new();
        assert_eq!(manager.discover(&[tmp.path().to_path_buf()]), 1);
    }

    #[test]
    fn prompt_section_xml_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let _ = write_skill(tmp.path(), "alpha", "First & foremost");
        let mut manager = SkillsManager::new();
        let _ = manager.discover(&[tmp.path().to_path_buf()]);

        let xml = manager.prompt_section();
        assert!(xml.starts_with("<available_skills>\n"));
        assert!(xml.ends_with("</available_skills>"));
        assert!(xml.contains("<name>alpha</name>"));
        assert!(xml.contains("First &amp; foremost"));
    }

    #[test]
    fn prompt_section_empty_without_skills() {
        assert!(SkillsManager::new().prompt_section().is_empty());
    }
}
