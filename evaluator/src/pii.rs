//! PII detection: email and phone patterns, ignore-pattern matching, and
//! data-file scanning across the medallion layers.
//!
//! The patterns are a best-effort lint, not a security guarantee. Matching is
//! conservative: a borderline file is scanned unless it is explicitly ignored.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::snapshot::{CONTENT_READ_CAP, Snapshot, read_file_capped};

/// Max characters scanned from a single structured data file.
const DATA_FILE_READ_CAP: usize = 500_000;

/// Medallion layer directories scanned under `data/`.
const DATA_LAYERS: &[&str] = &["raw", "bronze", "silver", "gold"];

/// Structured data formats scanned for PII.
const DATA_EXTENSIONS: &[&str] = &["json", "csv", "parquet"];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("email pattern")
});

// International (+prefix) or US-style (xxx) xxx-xxxx only; avoids matching
// version numbers or IPs.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[-.\s]?\d{2,}(?:[-.\s]?\d{2,}){2,}|\(\d{3}\)\s*\d{3}[-.]?\d{4})\b")
        .expect("phone pattern")
});

/// True if the text contains an email or phone-like value.
pub fn text_has_pii(text: &str) -> bool {
    EMAIL_RE.is_match(text) || PHONE_RE.is_match(text)
}

/// True if no PII is found in Python sources under `src/`, `ingestion/`, or
/// directly at the repository root.
pub fn no_pii_in_source_files(snap: &Snapshot) -> bool {
    for base in ["src", "ingestion"] {
        for file in snap.python_files(&snap.path(base)) {
            if text_has_pii(&read_file_capped(&file, CONTENT_READ_CAP)) {
                return false;
            }
        }
    }
    for file in snap.root_python_files() {
        if text_has_pii(&read_file_capped(&file, CONTENT_READ_CAP)) {
            return false;
        }
    }
    true
}

/// True if no PII is found in non-ignored JSON/CSV/Parquet files under the
/// medallion layer directories.
pub fn no_pii_in_data_layers(snap: &Snapshot) -> bool {
    let data_dir = snap.path("data");
    if !data_dir.is_dir() {
        return true;
    }
    let patterns = load_ignore_patterns(snap.root());
    for layer in DATA_LAYERS {
        let layer_dir = data_dir.join(layer);
        for &ext in DATA_EXTENSIONS {
            for file in snap.files_with_extension(&layer_dir, ext) {
                let Ok(rel) = file.strip_prefix(snap.root()) else {
                    continue;
                };
                let rel_posix = rel.to_string_lossy().replace('\\', "/");
                if is_ignored(&rel_posix, &patterns) {
                    continue;
                }
                if data_file_has_pii(&file, ext) {
                    return false;
                }
            }
        }
    }
    true
}

fn data_file_has_pii(file: &Path, ext: &str) -> bool {
    // Parquet is scanned as lossy text: string values survive in plain data
    // pages, and a garbled read cannot produce an email-shaped match.
    let _ = ext;
    text_has_pii(&read_file_capped(file, DATA_FILE_READ_CAP))
}

/// Load `.gitignore` patterns: comments and blanks stripped, separators
/// normalized to `/`.
pub fn load_ignore_patterns(root: &Path) -> Vec<String> {
    let contents = read_file_capped(&root.join(".gitignore"), CONTENT_READ_CAP);
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.replace('\\', "/"))
        .collect()
}

/// True if a repo-relative posix path is matched by any ignore pattern.
///
/// Supports `*`/`?` wildcards plus the recursive `**` segment. Directory
/// patterns also match the files beneath them.
pub fn is_ignored(rel_posix: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        if pattern.contains("**") {
            return matches_recursive_pattern(pattern, rel_posix);
        }
        wildcard_match(pattern, rel_posix)
            || wildcard_match(&format!("{}/*", pattern.trim_end_matches('/')), rel_posix)
    })
}

fn matches_recursive_pattern(pattern: &str, rel_posix: &str) -> bool {
    let parts: Vec<&str> = pattern.split("**").collect();
    let prefix = parts[0].trim_end_matches('/');
    let suffix = if parts.len() > 1 {
        parts[parts.len() - 1].trim_start_matches('/')
    } else {
        ""
    };
    if !prefix.is_empty()
        && !rel_posix.starts_with(&format!("{prefix}/"))
        && rel_posix != prefix
    {
        return false;
    }
    if !suffix.is_empty()
        && !rel_posix.ends_with(suffix)
        && !wildcard_match(&format!("*{suffix}"), rel_posix)
    {
        return false;
    }
    true
}

/// fnmatch-style wildcard match: `*` matches any run of characters
/// (including `/`), `?` matches a single character.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let mut regex = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            _ => regex.push_str(&regex::escape(&ch.to_string())),
        }
    }
    regex.push('$');
    match Regex::new(&regex) {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}
