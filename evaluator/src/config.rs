//! Evaluator configuration loaded from `evaluator.toml`.
//!
//! All tunables the harness and scorer recognize live here; nothing deeper in
//! the pipeline reads the process environment. Environment overrides are
//! applied once, at the CLI boundary, via [`EvalConfig::apply_env_overrides`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Environment variables forwarded into the sandbox when set and non-empty
/// on the host. Cloud credentials plus the raw-input override.
pub const ENV_ALLOWLIST: &[&str] = &[
    "AZURE_CLIENT_ID",
    "AZURE_TENANT_ID",
    "AZURE_CLIENT_SECRET",
    "AZURE_SUBSCRIPTION_ID",
    "AZURE_CLIENT_CERTIFICATE_PATH",
    "AZURE_USE_IDENTITY",
    "AZURE_ACCOUNT_URL",
    "AZURE_CONTAINER_NAME",
    "AZURE_BLOB_NAME",
    "AZURE_BLOB_PREFIX",
    "RAW_INPUT_FILENAME",
];

/// Evaluator configuration (TOML).
///
/// Missing fields default to the values used for production evaluations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EvalConfig {
    /// Wall-clock budget for one sandboxed pipeline run, in seconds.
    pub timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many characters.
    pub output_limit_chars: usize,

    /// Container image used to execute candidate pipelines.
    pub sandbox_image: String,

    /// Directory where repositories are cloned, relative to the working dir.
    pub repos_dir: String,

    /// Host-side path of the clone directory when the evaluator itself runs
    /// inside a container and the sandbox mount must use the host path.
    pub host_repos_dir: Option<String>,

    /// Override for the expected raw input filename. `None` resolves it from
    /// the candidate repository.
    pub raw_input_filename: Option<String>,

    /// Operator-forced run command; wins over all discovery.
    pub run_command: Option<String>,

    /// Prefer the instruction-derived run command over auto-discovery.
    pub prefer_instruction_command: bool,

    /// Character budget for the compact evaluation report.
    pub summary_max_chars: usize,

    /// Agent CLI used for subjective grading and instruction-derived
    /// commands (e.g. `["codex", "exec", "-"]`). Empty disables the agent.
    pub agent_command: Vec<String>,

    /// Values collected from the host environment for forwarding into the
    /// sandbox. Populated by [`EvalConfig::collect_forward_env`], never from
    /// the file.
    #[serde(skip)]
    pub forward_env: BTreeMap<String, String>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 180,
            output_limit_chars: 4000,
            sandbox_image: "python:3.12-slim".to_string(),
            repos_dir: "repos".to_string(),
            host_repos_dir: None,
            raw_input_filename: None,
            run_command: None,
            prefer_instruction_command: false,
            summary_max_chars: 1800,
            agent_command: Vec::new(),
            forward_env: BTreeMap::new(),
        }
    }
}

impl EvalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.output_limit_chars == 0 {
            return Err(anyhow!("output_limit_chars must be > 0"));
        }
        if self.summary_max_chars == 0 {
            return Err(anyhow!("summary_max_chars must be > 0"));
        }
        if self.sandbox_image.trim().is_empty() {
            return Err(anyhow!("sandbox_image must be non-empty"));
        }
        if self.repos_dir.trim().is_empty() {
            return Err(anyhow!("repos_dir must be non-empty"));
        }
        Ok(())
    }

    /// Apply recognized environment overrides.
    ///
    /// `vars` is passed in so callers outside the CLI (tests) never touch the
    /// real process environment.
    pub fn apply_env_overrides(&mut self, vars: &BTreeMap<String, String>) {
        if let Some(value) = vars.get("RAW_INPUT_FILENAME")
            && !value.trim().is_empty()
        {
            self.raw_input_filename = Some(value.trim().to_string());
        }
        if let Some(value) = vars.get("EVAL_PREFER_README_COMMAND") {
            self.prefer_instruction_command =
                matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(value) = vars.get("EVAL_SUMMARY_MAX_CHARS")
            && let Ok(parsed) = value.trim().parse::<usize>()
            && parsed > 0
        {
            self.summary_max_chars = parsed;
        }
    }

    /// Collect allow-listed, non-empty values for forwarding into the sandbox.
    pub fn collect_forward_env(&mut self, vars: &BTreeMap<String, String>) {
        self.forward_env = ENV_ALLOWLIST
            .iter()
            .filter_map(|name| {
                vars.get(*name)
                    .filter(|value| !value.trim().is_empty())
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect();
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `EvalConfig::default()`.
pub fn load_config(path: &Path) -> Result<EvalConfig> {
    if !path.exists() {
        let cfg = EvalConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: EvalConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
