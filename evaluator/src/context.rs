//! Evidence collection for the grading agent.
//!
//! Gathers README, a depth-limited project tree, a naming audit, the SLA and
//! main pipeline files, and the execution summary. Every file read is capped
//! so the evidence stays within a predictable size.

use std::path::Path;

use crate::harness::ExecutionOutcome;
use crate::snapshot::{Snapshot, read_file_capped, truncate_chars};

/// Max characters included per file.
const MAX_CHARS_PER_FILE: usize = 4000;

/// Directory tree depth included in the evidence.
const TREE_DEPTH: usize = 3;

/// Max characters of stdout/stderr preview in the execution summary.
const STREAM_PREVIEW_CHARS: usize = 500;

const LISTED_PYTHON_FILES_MAX: usize = 80;
const LISTED_DATA_FILES_MAX: usize = 50;

/// Collected evidence, one instance per evaluated repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evidence {
    pub readme: String,
    pub project_tree: String,
    pub naming_audit: String,
    pub sla_calculation: String,
    pub main_pipeline: String,
    pub execution_summary: String,
}

/// Gather evidence from the snapshot and the execution outcome.
pub fn collect_evidence(snap: &Snapshot, outcome: &ExecutionOutcome) -> Evidence {
    let mut evidence = Evidence {
        readme: read_limited(&snap.path("README.md")),
        project_tree: render_tree(snap.root(), "", 0),
        naming_audit: naming_audit(snap),
        ..Evidence::default()
    };

    for rel in ["sla_calculation.py", "src/sla/sla_calculation.py"] {
        let path = snap.path(rel);
        if path.is_file() {
            evidence.sla_calculation = read_limited(&path);
            break;
        }
    }
    for rel in ["main.py", "run_pipeline.py", "src/main.py", "src/run_pipeline.py"] {
        let path = snap.path(rel);
        if path.is_file() {
            evidence.main_pipeline = read_limited(&path);
            break;
        }
    }

    evidence.execution_summary = execution_summary(outcome);
    evidence
}

/// Format the evidence as a single prompt string.
pub fn evidence_to_string(evidence: &Evidence) -> String {
    let section = |text: &str, missing: &str| {
        if text.is_empty() {
            missing.to_string()
        } else {
            text.to_string()
        }
    };
    [
        "=== README.md ===".to_string(),
        section(&evidence.readme, "(none)"),
        "\n=== Project tree (depth 3) ===".to_string(),
        section(&evidence.project_tree, "(none)"),
        "\n=== Naming audit (folders, Python files, data files) ===".to_string(),
        section(&evidence.naming_audit, "(none)"),
        "\n=== sla_calculation.py ===".to_string(),
        section(&evidence.sla_calculation, "(not found)"),
        "\n=== Main pipeline file ===".to_string(),
        section(&evidence.main_pipeline, "(none)"),
        "\n=== Execution summary ===".to_string(),
        evidence.execution_summary.clone(),
    ]
    .join("\n")
}

fn execution_summary(outcome: &ExecutionOutcome) -> String {
    [
        format!("pipeline_runs: {}", outcome.ran),
        format!("gold_generated: {}", outcome.gold_artifact_present),
        format!(
            "exit_code: {}",
            outcome
                .exit_code
                .map_or_else(|| "none".to_string(), |code| code.to_string())
        ),
        format!(
            "stdout_preview: {}",
            truncate_chars(&outcome.stdout, STREAM_PREVIEW_CHARS)
        ),
        format!(
            "stderr_preview: {}",
            truncate_chars(&outcome.stderr, STREAM_PREVIEW_CHARS)
        ),
        format!("error: {}", outcome.error.as_deref().unwrap_or("none")),
    ]
    .join("\n")
}

fn read_limited(path: &Path) -> String {
    let text = read_file_capped(path, MAX_CHARS_PER_FILE + 1);
    if text.chars().count() > MAX_CHARS_PER_FILE {
        format!(
            "{}\n... [truncated]",
            truncate_chars(&text, MAX_CHARS_PER_FILE)
        )
    } else {
        text
    }
}

fn sorted_entries(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut entries: Vec<std::path::PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect(),
        Err(_) => return Vec::new(),
    };
    // Directories first, then case-insensitive by name.
    entries.sort_by_key(|path| {
        (
            path.is_file(),
            path.file_name()
                .map(|name| name.to_string_lossy().to_lowercase())
                .unwrap_or_default(),
        )
    });
    entries
}

fn skip_in_tree(name: &str) -> bool {
    (name.starts_with('.') && name != ".git")
        || matches!(name, "venv" | ".venv" | "__pycache__" | "node_modules")
}

fn render_tree(dir: &Path, prefix: &str, depth: usize) -> String {
    if depth >= TREE_DEPTH {
        return String::new();
    }
    let entries: Vec<_> = sorted_entries(dir)
        .into_iter()
        .filter(|path| {
            path.file_name()
                .map(|name| !skip_in_tree(&name.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();
    let mut lines = Vec::new();
    for (index, path) in entries.iter().enumerate() {
        let is_last = index == entries.len() - 1;
        let branch = if is_last { "└── " } else { "├── " };
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        lines.push(format!("{prefix}{branch}{name}"));
        if path.is_dir() && depth + 1 < TREE_DEPTH {
            let extension = if is_last { "    " } else { "│   " };
            let nested = render_tree(path, &format!("{prefix}{extension}"), depth + 1);
            if !nested.is_empty() {
                lines.push(nested);
            }
        }
    }
    lines.join("\n")
}

fn naming_audit(snap: &Snapshot) -> String {
    let mut lines = Vec::new();
    for path in sorted_entries(snap.root()) {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        if name != ".git" && (name.starts_with('.') || skip_in_tree(&name)) {
            continue;
        }
        if path.is_dir() {
            lines.push(format!("folder: {name}/"));
            for nested in sorted_entries(&path) {
                let nested_name = match nested.file_name() {
                    Some(name) => name.to_string_lossy().into_owned(),
                    None => continue,
                };
                if nested_name.starts_with('.') || nested_name == "__pycache__" {
                    continue;
                }
                let suffix = if nested.is_dir() { "/" } else { "" };
                lines.push(format!("  {nested_name}{suffix}"));
            }
        } else {
            lines.push(format!("file: {name}"));
        }
    }

    let mut python_files: Vec<String> = Vec::new();
    for base in ["src", "ingestion", "tests"] {
        for file in snap.python_files(&snap.path(base)) {
            if let Ok(rel) = file.strip_prefix(snap.root()) {
                python_files.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    for file in snap.root_python_files() {
        if let Ok(rel) = file.strip_prefix(snap.root()) {
            python_files.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    python_files.sort();
    python_files.dedup();
    if !python_files.is_empty() {
        lines.push("\nPython files:".to_string());
        for file in python_files.iter().take(LISTED_PYTHON_FILES_MAX) {
            lines.push(format!("  {file}"));
        }
    }

    let data_dir = snap.path("data");
    if data_dir.is_dir() {
        let mut data_files: Vec<String> = walkdir::WalkDir::new(&data_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(snap.root())
                    .ok()
                    .map(|rel| rel.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        data_files.sort();
        if !data_files.is_empty() {
            lines.push("\nData files:".to_string());
            for file in data_files.iter().take(LISTED_DATA_FILES_MAX) {
                lines.push(format!("  {file}"));
            }
        }
    }

    if lines.is_empty() {
        "(none)".to_string()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn outcome() -> ExecutionOutcome {
        ExecutionOutcome {
            ran: true,
            exit_code: Some(0),
            stdout: "done".to_string(),
            stderr: String::new(),
            gold_artifact_present: true,
            error: None,
        }
    }

    #[test]
    fn collects_readme_and_pipeline_files() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("README.md"), "# Pipeline\nRun it").expect("readme");
        fs::write(temp.path().join("main.py"), "run()").expect("main");
        fs::write(temp.path().join("sla_calculation.py"), "def sla(): pass").expect("sla");

        let evidence = collect_evidence(&Snapshot::new(temp.path()), &outcome());
        assert_eq!(evidence.readme, "# Pipeline\nRun it");
        assert_eq!(evidence.main_pipeline, "run()");
        assert_eq!(evidence.sla_calculation, "def sla(): pass");
        assert!(evidence.execution_summary.contains("pipeline_runs: true"));
    }

    #[test]
    fn evidence_string_marks_missing_sections() {
        let temp = tempdir().expect("tempdir");
        let evidence = collect_evidence(&Snapshot::new(temp.path()), &outcome());
        let text = evidence_to_string(&evidence);
        assert!(text.contains("=== README.md ===\n(none)"));
        assert!(text.contains("=== sla_calculation.py ===\n(not found)"));
    }

    #[test]
    fn tree_is_depth_limited_and_prunes_caches() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("src/deep/deeper/deepest")).expect("dirs");
        fs::create_dir_all(temp.path().join("__pycache__")).expect("cache");
        fs::write(temp.path().join("src/main.py"), "").expect("write");

        let tree = render_tree(temp.path(), "", 0);
        assert!(tree.contains("src"));
        assert!(tree.contains("main.py"));
        assert!(tree.contains("deeper"));
        assert!(!tree.contains("deepest"));
        assert!(!tree.contains("__pycache__"));
    }

    #[test]
    fn long_files_are_truncated_with_a_marker() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("README.md"), "x".repeat(5000)).expect("readme");
        let evidence = collect_evidence(&Snapshot::new(temp.path()), &outcome());
        assert!(evidence.readme.ends_with("... [truncated]"));
        assert!(evidence.readme.chars().count() <= MAX_CHARS_PER_FILE + 20);
    }

    #[test]
    fn naming_audit_lists_folders_and_python_files() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("src")).expect("src");
        fs::create_dir_all(temp.path().join("data/raw")).expect("data");
        fs::write(temp.path().join("src/main.py"), "").expect("write");
        fs::write(temp.path().join("data/raw/tickets.json"), "{}").expect("write");

        let audit = naming_audit(&Snapshot::new(temp.path()));
        assert!(audit.contains("folder: src/"));
        assert!(audit.contains("Python files:"));
        assert!(audit.contains("  src/main.py"));
        assert!(audit.contains("Data files:"));
        assert!(audit.contains("  data/raw/tickets.json"));
    }
}
