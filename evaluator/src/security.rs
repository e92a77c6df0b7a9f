//! Security practices score (0-100) from credential handling and repository
//! hygiene checks.
//!
//! The credential patterns are heuristic; they are scored as a lint, not as a
//! security guarantee.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::snapshot::{Snapshot, read_file_capped};

/// Max characters read per file during the security scan.
const SECURITY_READ_CAP: usize = 100_000;

// Points per category (total 100)
const POINTS_NO_HARDCODED: u32 = 40;
const POINTS_ENV_VARS: u32 = 20;
const POINTS_ENV_IGNORED: u32 = 15;
const POINTS_GITIGNORE_SECURITY: u32 = 15;
const POINTS_SAFE_CONFIG: u32 = 10;

/// File extensions included in the credential scan.
const SCANNED_EXTENSIONS: &[&str] = &["py", "yml", "yaml", "json"];

/// `.gitignore` entries that improve security (presence = good).
const GITIGNORE_SECURITY_ENTRIES: &[&str] = &[
    ".env",
    "secrets.json",
    "credentials.json",
    "*.key",
    "*.pem",
    ".env.local",
    ".env.*.local",
];

static HARDCODED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#"(?i)\b(?:api_key|apikey)\s*=\s*["'][^"']+["']"#,
        r#"(?i)\bpassword\s*=\s*["'][^"']*["']"#,
        r#"(?i)\bclient_secret\s*=\s*["'][^"']+["']"#,
        r#"(?i)\b(?:secret_key|secret)\s*=\s*["'][^"']+["']"#,
        r#"(?i)\b(?:access_key|access_token|token)\s*=\s*["'][^"']+["']"#,
        r#"(?i)\b(?:connection_string|conn_str|connection_str)\s*=\s*["'][^"']+["']"#,
        r"(?im)^\s*ACCESS_KEY\s*=\s*.+",
        r"(?im)^\s*SECRET_KEY\s*=\s*.+",
        r"(?im)^\s*SECRET_ACCESS_KEY\s*=\s*.+",
        r"\bsk-[a-zA-Z0-9]{20,}\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("credential pattern"))
    .collect()
});

static ENV_VAR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bos\.getenv\s*\(",
        r"\bos\.environ\s*\[",
        r"\bos\.environ\.get\s*\(",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("env pattern"))
    .collect()
});

/// True if the content matches any hardcoded-credential pattern.
pub fn has_hardcoded_credentials(content: &str) -> bool {
    HARDCODED_PATTERNS.iter().any(|re| re.is_match(content))
}

/// True if the content reads configuration from environment variables.
pub fn uses_env_vars(content: &str) -> bool {
    ENV_VAR_PATTERNS.iter().any(|re| re.is_match(content))
}

/// Normalized `.gitignore` lines (stripped, comments removed).
fn gitignore_lines(root: &Path) -> Vec<String> {
    read_file_capped(&root.join(".gitignore"), SECURITY_READ_CAP)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}

/// True if `.env` does not exist, or exists and is covered by `.gitignore`.
fn env_ignored_properly(root: &Path) -> bool {
    if !root.join(".env").exists() {
        return true;
    }
    gitignore_lines(root)
        .iter()
        .any(|line| line == ".env" || line.starts_with(".env"))
}

/// True if a top-level config file carries credential-like content.
fn config_has_secrets(snap: &Snapshot) -> bool {
    static CONFIG_SECRET_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?i)(?:password|secret|api_key|token|key):\s*["']?[a-zA-Z0-9_\-]{8,}"#)
            .expect("config secret pattern")
    });
    for name in [
        "config.yaml",
        "config.yml",
        "config.json",
        "configuration.yaml",
        "configuration.json",
    ] {
        let content = snap.read_capped(name, SECURITY_READ_CAP);
        if content.is_empty() {
            continue;
        }
        if has_hardcoded_credentials(&content) || CONFIG_SECRET_RE.is_match(&content) {
            return true;
        }
    }
    false
}

fn gitignore_security_points(root: &Path) -> u32 {
    let lines = gitignore_lines(root);
    let mut found = 0u32;
    for &entry in GITIGNORE_SECURITY_ENTRIES {
        let covered = lines.iter().any(|line| {
            line.as_str() == entry
                || (entry.starts_with('*') && line.ends_with(&entry[1..]))
                || line.contains(entry)
        });
        if covered {
            found += 1;
        }
    }
    (found * 5).min(POINTS_GITIGNORE_SECURITY)
}

/// Compute the security practices score.
///
/// Categories: no hardcoded credentials (40), environment-variable usage
/// (20), `.env` ignored properly (15), security entries in `.gitignore`
/// (15), config files free of secrets (10).
pub fn compute_security_score(snap: &Snapshot) -> u32 {
    let mut hardcoded_found = false;
    let mut env_used = false;
    for &ext in SCANNED_EXTENSIONS {
        for file in snap.files_with_extension(snap.root(), ext) {
            let content = read_file_capped(&file, SECURITY_READ_CAP);
            if has_hardcoded_credentials(&content) {
                hardcoded_found = true;
            }
            if uses_env_vars(&content) {
                env_used = true;
            }
        }
    }

    let mut score = 0;
    if !hardcoded_found {
        score += POINTS_NO_HARDCODED;
    }
    if env_used {
        score += POINTS_ENV_VARS;
    }
    if env_ignored_properly(snap.root()) {
        score += POINTS_ENV_IGNORED;
    }
    score += gitignore_security_points(snap.root());
    if !config_has_secrets(snap) {
        score += POINTS_SAFE_CONFIG;
    }
    score.min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn detects_hardcoded_credentials() {
        assert!(has_hardcoded_credentials(r#"api_key = "abc123""#));
        assert!(has_hardcoded_credentials(r#"client_secret = 'shh'"#));
        assert!(has_hardcoded_credentials("sk-abcdefghijklmnopqrstuv"));
        assert!(!has_hardcoded_credentials("api_key = os.getenv('API_KEY')"));
    }

    #[test]
    fn detects_env_var_usage() {
        assert!(uses_env_vars("key = os.getenv('API_KEY')"));
        assert!(uses_env_vars("key = os.environ['API_KEY']"));
        assert!(!uses_env_vars("key = 'literal'"));
    }

    #[test]
    fn clean_repo_scores_high() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join("main.py"),
            "import os\nkey = os.getenv('API_KEY')\n",
        )
        .expect("write");
        fs::write(temp.path().join(".gitignore"), ".env\n*.key\n").expect("gitignore");
        let snap = Snapshot::new(temp.path());
        let score = compute_security_score(&snap);
        // 40 (no hardcoded) + 20 (env vars) + 15 (.env ignored) + 10
        // (security entries) + 10 (safe config)
        assert_eq!(score, 95);
    }

    #[test]
    fn hardcoded_credentials_lose_points() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("main.py"), r#"password = "hunter2""#).expect("write");
        let snap = Snapshot::new(temp.path());
        let score = compute_security_score(&snap);
        assert!(score < 60, "score {score}");
    }

    #[test]
    fn unignored_env_file_loses_points() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join(".env"), "SECRET=1").expect("env");
        let without_ignore = compute_security_score(&Snapshot::new(temp.path()));
        fs::write(temp.path().join(".gitignore"), ".env\n").expect("gitignore");
        let with_ignore = compute_security_score(&Snapshot::new(temp.path()));
        assert!(with_ignore > without_ignore);
    }

    #[test]
    fn config_secrets_lose_points() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("config.yaml"), "password: supersecret123\n").expect("config");
        let snap = Snapshot::new(temp.path());
        let with_secret = compute_security_score(&snap);
        fs::write(temp.path().join("config.yaml"), "retries: 3\n").expect("config");
        let without_secret = compute_security_score(&snap);
        assert!(without_secret > with_secret);
    }
}
