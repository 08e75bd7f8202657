//! Static predicate for credential/secret-bearing files.

use std::path::Path;

/// Sensitive file names. Matched exactly and as substrings of the filename
/// (so `prod.env` is caught; `.environment` is a known false positive that
/// is kept for safety).
const SENSITIVE_NAMES: &[&str] = &[
    ".env",
    ".env.local",
    ".env.production",
    ".env.development",
    ".netrc",
    ".npmrc",
    ".pypirc",
    "id_rsa",
    "id_dsa",
    "id_ecdsa",
    "id_ed25519",
    "credentials",
    "credentials.json",
    "credentials.yaml",
    "secrets",
    "secrets.json",
    "secrets.yaml",
    "secrets.yml",
    ".htpasswd",
    ".htaccess",
    "shadow",
    "passwd",
    "private_key",
    "privatekey",
    "service_account",
    "service-account",
    "token",
    "token.json",
    "keystore",
    "keystore.jks",
    ".pgpass",
    ".my.cnf",
];

/// Sensitive file extensions (matched exactly, case-insensitive).
const SENSITIVE_EXTENSIONS: &[&str] = &[
    ".pem",
    ".key",
    ".p12",
    ".pfx",
    ".jks",
    ".keystore",
    ".secret",
    ".secrets",
    ".cert",
    ".crt",
    ".cer",
];

/// Whether a path points at a file that may hold credentials or secrets.
///
/// Matching is case-insensitive over the final path component.
#[must_use]
pub fn is_sensitive_file(path: &Path) -> bool {
    let Some(filename) = path.file_name().and_then(|f| f.to_str()) else {
        return false;
    };
    let filename = filename.to_lowercase();

    for name in SENSITIVE_NAMES {
        if filename == *name || filename.contains(name) {
            return true;
        }
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    if SENSITIVE_EXTENSIONS.contains(&extension.as_str()) {
        return true;
    }

    filename.contains("aws") && (filename.contains("credential") || filename.contains("config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensitive(p: &str) -> bool {
        is_sensitive_file(Path::new(p))
    }

    #[test]
    fn exact_names_match() {
        assert!(sensitive("/project/.env"));
        assert!(sensitive("/home/user/.netrc"));
        assert!(sensitive("/etc/shadow"));
        assert!(sensitive("~/.ssh/id_rsa"));
        assert!(sensitive("secrets.yml"));
    }

    #[test]
    fn contains_match_catches_variants() {
        assert!(sensitive("/project/prod.env"));
        assert!(sensitive("backup_credentials.json"));
        assert!(sensitive("my-service-account.txt"));
    }

    #[test]
    fn dot_environment_false_positive_is_kept() {
        // `.environment` contains `.env`; the conservative behavior is to
        // block it too.
        assert!(sensitive("/project/.environment"));
    }

    #[test]
    fn extensions_match() {
        assert!(sensitive("server.pem"));
        assert!(sensitive("tls.KEY"));
        assert!(sensitive("bundle.crt"));
        assert!(sensitive("release.keystore"));
    }

    #[test]
    fn aws_credential_combo_matches() {
        assert!(sensitive("aws_credentials"));
        assert!(sensitive("aws-config.ini"));
        assert!(!sensitive("awesome.txt"));
    }

    #[test]
    fn case_insensitive() {
        assert!(sensitive("/project/.ENV"));
        assert!(sensitive("ID_RSA"));
    }

    #[test]
    fn ordinary_files_pass() {
        assert!(!sensitive("/project/src/main.rs"));
        assert!(!sensitive("README.md"));
        assert!(!sensitive("Cargo.toml"));
        assert!(!sensitive("notes.txt"));
    }
}
