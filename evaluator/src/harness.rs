//! Sandboxed pipeline execution.
//!
//! Runs the resolved entrypoint command inside a fresh container with the
//! repository mounted, dependency installation allowed, and a hard wall-clock
//! timeout. The repository tree is the only shared state; the container is
//! removed on every exit path.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::cloud;
use crate::config::EvalConfig;
use crate::process::run_command_with_timeout;
use crate::snapshot::{CONTENT_READ_CAP, Snapshot, read_file_capped, truncate_chars};

/// Raw input expected at the repo root when ingestion is local-file based.
pub const DEFAULT_RAW_INPUT_FILENAME: &str = "tickets_raw.json";

/// Minimal raw payload seeded when the input file is missing from the clone.
/// Schema: an `issues` list; empty is valid.
const MINIMAL_RAW_JSON: &[u8] = br#"{"issues": []}"#;

/// Gold layer directory inspected for report artifacts.
const GOLD_DIR: &str = "data/gold";

/// Outcome of one sandboxed execution. Created once per repository per
/// evaluation, then only read.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// True only when the command ran and exited 0.
    pub ran: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// True when `data/gold` holds at least one CSV report after the run.
    pub gold_artifact_present: bool,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    fn not_run(error: String) -> Self {
        Self {
            ran: false,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            gold_artifact_present: false,
            error: Some(error),
        }
    }
}

/// Run the pipeline command inside the sandbox and verify the gold artifact.
///
/// `command` is the already-resolved run command; `None` means resolution
/// failed, which is reported distinctly from "resolved but failed to run".
#[instrument(skip_all, fields(repo = %snap.root().display()))]
pub fn run_pipeline(snap: &Snapshot, command: Option<&str>, cfg: &EvalConfig) -> ExecutionOutcome {
    let Some(command) = command else {
        return ExecutionOutcome::not_run(
            "No main.py, run_pipeline.py, or src/main.py found (and no run command from instructions)"
                .to_string(),
        );
    };

    if let Some(blocked) = ensure_raw_input(snap, cfg) {
        warn!(error = %blocked, "skipping pipeline run");
        return ExecutionOutcome::not_run(blocked);
    }

    info!(command, image = %cfg.sandbox_image, "running pipeline in sandbox");
    let cmd = sandbox_command(snap.root(), command, cfg);
    let result = run_command_with_timeout(
        cmd,
        None,
        Duration::from_secs(cfg.timeout_secs),
        cfg.output_limit_chars * 4,
    );

    let mut outcome = match result {
        Ok(output) => {
            let stdout = truncate_chars(&output.stdout_lossy(), cfg.output_limit_chars);
            let stderr = truncate_chars(&output.stderr_lossy(), cfg.output_limit_chars);
            if output.timed_out {
                let mut timed_out = ExecutionOutcome::not_run(format!(
                    "Pipeline execution timed out ({}s)",
                    cfg.timeout_secs
                ));
                timed_out.stdout = stdout;
                timed_out.stderr = stderr;
                timed_out
            } else {
                let exit_code = output.status.code();
                let ran = output.status.success();
                let error = if ran {
                    None
                } else if stderr.trim().is_empty() {
                    Some(format!("Exit code {}", exit_code.unwrap_or(-1)))
                } else {
                    Some(stderr.clone())
                };
                ExecutionOutcome {
                    ran,
                    exit_code,
                    stdout,
                    stderr,
                    gold_artifact_present: false,
                    error,
                }
            }
        }
        Err(err) => ExecutionOutcome::not_run(spawn_failure_message(&err)),
    };

    outcome.gold_artifact_present = gold_has_report(snap);
    outcome
}

/// True when the gold layer holds at least one CSV report.
pub fn gold_has_report(snap: &Snapshot) -> bool {
    !snap
        .files_with_extension(&snap.path(GOLD_DIR), "csv")
        .is_empty()
}

/// Verify (or seed) the local raw input file; returns a blocking error
/// message only when the file is missing and seeding failed.
///
/// Repositories with cloud-ingestion markers skip this gate entirely.
pub fn ensure_raw_input(snap: &Snapshot, cfg: &EvalConfig) -> Option<String> {
    if cloud::uses_cloud_ingestion(snap) {
        return None;
    }
    let filename = raw_input_filename(snap, cfg);
    let raw_path = snap.path(&filename);
    if raw_path.is_file() {
        return None;
    }
    match std::fs::write(&raw_path, MINIMAL_RAW_JSON) {
        Ok(()) => {
            info!(filename, "seeded minimal raw input for pipeline run");
            None
        }
        Err(err) => {
            warn!(filename, error = %err, "could not seed raw input");
            Some(format!(
                "Repo uses local file ingestion but required input file is missing: {filename} \
                 (expected at repo root). Add the file or use cloud ingestion."
            ))
        }
    }
}

/// Resolve the expected raw input filename.
///
/// Priority: environment-example file, code-embedded default, operator
/// override, hard-coded default.
pub fn raw_input_filename(snap: &Snapshot, cfg: &EvalConfig) -> String {
    if let Some(name) = raw_filename_from_env_example(snap) {
        return name;
    }
    if let Some(name) = raw_filename_from_code(snap) {
        return name;
    }
    if let Some(name) = &cfg.raw_input_filename {
        return name.clone();
    }
    DEFAULT_RAW_INPUT_FILENAME.to_string()
}

fn raw_filename_from_env_example(snap: &Snapshot) -> Option<String> {
    for env_name in [".env.example", ".env.sample"] {
        let contents = snap.read_capped(env_name, CONTENT_READ_CAP);
        for line in contents.lines() {
            let line = line.trim();
            if let Some(raw_value) = line.strip_prefix("RAW_INPUT_FILENAME=") {
                let value = raw_value
                    .trim()
                    .trim_matches(|c| c == '\'' || c == '"')
                    .split('#')
                    .next()
                    .unwrap_or("")
                    .trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

static GETENV_RAW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)getenv\s*\(\s*["']RAW_INPUT_FILENAME["']\s*,\s*["']([^"']+)["']\s*\)"#)
        .expect("getenv pattern")
});

fn raw_filename_from_code(snap: &Snapshot) -> Option<String> {
    let mut files = Vec::new();
    for base in ["src", "ingestion"] {
        files.extend(snap.python_files(&snap.path(base)));
    }
    files.extend(snap.root_python_files());
    for file in files {
        let contents = read_file_capped(&file, CONTENT_READ_CAP);
        if let Some(captures) = GETENV_RAW_RE.captures(&contents) {
            let value = captures[1].trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Build the sandbox invocation for the resolved command.
fn sandbox_command(root: &Path, command: &str, cfg: &EvalConfig) -> Command {
    let mut cmd = Command::new("docker");
    cmd.args(sandbox_args(root, command, cfg));
    cmd.current_dir(root);
    cmd
}

fn sandbox_args(root: &Path, command: &str, cfg: &EvalConfig) -> Vec<String> {
    let mount_src = mount_source(root, cfg);
    let mut args = vec![
        "run".to_string(),
        "--rm".to_string(),
        "-v".to_string(),
        format!("{}:/app", mount_src.display()),
        "-w".to_string(),
        "/app".to_string(),
        "-e".to_string(),
        "PYTHONUNBUFFERED=1".to_string(),
    ];
    for (name, value) in &cfg.forward_env {
        args.push("-e".to_string());
        args.push(format!("{name}={value}"));
    }
    args.push(cfg.sandbox_image.clone());
    args.push("bash".to_string());
    args.push("-c".to_string());
    args.push(format!(
        "pip install -q -r requirements.txt 2>/dev/null; {command}"
    ));
    args
}

/// When the evaluator itself runs inside a container, the mount source must
/// use the host-side clone path rather than the in-container one.
fn mount_source(root: &Path, cfg: &EvalConfig) -> PathBuf {
    if let Some(host_dir) = &cfg.host_repos_dir
        && let Some(name) = root.file_name()
    {
        return Path::new(host_dir).join(name);
    }
    root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
}

fn spawn_failure_message(err: &anyhow::Error) -> String {
    let docker_missing = err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
    });
    if docker_missing {
        "Docker not found. Docker is required to run candidate pipelines; please install Docker."
            .to_string()
    } else {
        format!("{err:#}")
    }
}
