//! Path normalization for the external-directory check.
//!
//! The containment test must compare whole path components: `/repo_evil` is
//! not inside `/repo` even though it is a string prefix. Canonicalization is
//! attempted first so symlinks resolve; paths that do not exist yet fall
//! back to a lexical cleanup of `.` and `..` components.

use std::path::{Component, Path, PathBuf};

/// Normalize a path to an absolute form with `.`/`..` folded away.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    lexical_clean(&absolute)
}

/// Fold `.` and `..` components without touching the filesystem.
#[must_use]
pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let _ = cleaned.pop();
            }
            other => cleaned.push(other),
        }
    }
    cleaned
}

/// Whether `path` lies within `root` (or equals it), compared on whole
/// components of the normalized forms.
#[must_use]
pub fn is_within(path: &Path, root: &Path) -> bool {
    let path = normalize(path);
    let root = normalize(root);
    path == root || path.starts_with(&root)
}
