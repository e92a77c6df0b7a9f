//! Grading agent collaborator.
//!
//! The [`Agent`] trait decouples evaluation from the actual model backend.
//! The production implementation spawns a configurable agent CLI with the
//! prompt on stdin and reads its stdout. Tests use scripted agents that
//! return predetermined responses without spawning processes.
//!
//! The collaborator is opaque and unreliable by contract: malformed, empty,
//! or out-of-range responses are normalized or discarded, never surfaced as
//! fatal errors.

use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::EvalConfig;
use crate::process::run_command_with_timeout;
use crate::snapshot::truncate_chars;

/// Scale factor from agent grades (0-5) to column scores (0-100).
pub const GRADE_SCALE: u32 = 20;

const GRADE_MAX: u32 = 5;
const AGENT_SUMMARY_MAX_CHARS: usize = 500;
const INSTRUCTIONS_MAX_CHARS: usize = 8000;

const GRADING_PROMPT_HEADER: &str = "\
You are a senior Data Engineering reviewer evaluating a Python repository
that implements a medallion architecture pipeline (raw, bronze, silver,
gold) computing SLA metrics for support tickets. The gold layer must hold
an SLA-per-ticket table (resolved tickets only) and aggregated reports
(average SLA by analyst and by ticket type) as CSV or XLSX.

Use only the provided evidence. Return ONLY valid JSON with no other text:
{
  \"medallion_architecture\": 0-5,
  \"sla_logic\": 0-5,
  \"pipeline_organization\": 0-5,
  \"readme_clarity\": 0-5,
  \"code_quality\": 0-5,
  \"summary\": \"short technical summary\"
}

Evidence:
";

const RUN_COMMAND_PROMPT_HEADER: &str = "\
From the README below, extract the exact command to run the data pipeline.
Look for sections like \"How to Run\", \"Quick start\", or \"Usage\". The
command is usually something like `python main.py` or `python -m src.main`.
Reply with ONLY the command line, nothing else. If not found or unclear,
reply exactly: UNKNOWN

README:
";

/// Agent grades for the subjective dimensions plus a short narrative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentGrades {
    pub medallion_architecture: u32,
    pub sla_logic: u32,
    pub pipeline_organization: u32,
    pub readme_clarity: u32,
    pub code_quality: u32,
    pub summary: String,
}

/// Abstraction over agent backends.
pub trait Agent {
    /// Send one prompt, return the raw completion text.
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Agent that spawns a CLI command with the prompt on stdin.
pub struct CliAgent {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CliAgent {
    /// Build the agent from configuration; `None` when no command is set.
    pub fn from_config(cfg: &EvalConfig) -> Option<Self> {
        if cfg.agent_command.is_empty() {
            return None;
        }
        Some(Self {
            command: cfg.agent_command.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            output_limit_bytes: 256 * 1024,
        })
    }
}

impl Agent for CliAgent {
    fn complete(&self, prompt: &str) -> Result<String> {
        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        let output = run_command_with_timeout(
            cmd,
            Some(prompt.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )
        .context("run agent command")?;
        if output.timed_out {
            return Err(anyhow!("agent command timed out"));
        }
        if !output.status.success() {
            return Err(anyhow!(
                "agent command failed with status {:?}",
                output.status.code()
            ));
        }
        Ok(output.stdout_lossy())
    }
}

/// Ask the agent to grade the repository from the collected evidence.
///
/// Returns `None` on any failure (unreachable agent, malformed response), so
/// the caller falls back to the deterministic scores.
pub fn grade_repository(agent: &dyn Agent, evidence: &str) -> Option<AgentGrades> {
    let prompt = format!("{GRADING_PROMPT_HEADER}\n{evidence}\n");
    let response = match agent.complete(&prompt) {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "agent grading failed");
            return None;
        }
    };
    let parsed = match extract_json(&response) {
        Some(parsed) => parsed,
        None => {
            warn!("agent returned no parseable JSON");
            return None;
        }
    };
    let grades = normalize_grades(&parsed);
    debug!(?grades, "agent grades normalized");
    Some(grades)
}

/// Ask the agent for the pipeline run command described in the instructions.
///
/// Returns e.g. `python -m src.main`, or `None` when the instructions are
/// empty, the agent is unsure, or the reply does not look like a python
/// invocation.
pub fn run_command_from_instructions(agent: &dyn Agent, readme: &str) -> Option<String> {
    if readme.trim().is_empty() {
        return None;
    }
    let trimmed = truncate_chars(readme, INSTRUCTIONS_MAX_CHARS);
    let prompt = format!("{RUN_COMMAND_PROMPT_HEADER}\n{trimmed}\n");
    let response = match agent.complete(&prompt) {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "instruction command extraction failed");
            return None;
        }
    };
    let line = response.trim();
    if line.is_empty() || line.eq_ignore_ascii_case("UNKNOWN") {
        return None;
    }
    if !line.to_lowercase().contains("python") {
        return None;
    }
    Some(line.to_string())
}

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("code fence pattern")
});

/// Parse JSON from agent output, tolerating a markdown code fence.
fn extract_json(text: &str) -> Option<Value> {
    let text = text.trim();
    let body = CODE_FENCE_RE
        .captures(text)
        .map(|captures| captures[1].trim().to_string())
        .unwrap_or_else(|| text.to_string());
    serde_json::from_str(&body).ok()
}

/// Clamp every grade into 0-5 and bound the summary length. Missing or
/// non-numeric fields default to 0/empty.
fn normalize_grades(parsed: &Value) -> AgentGrades {
    let grade = |key: &str| -> u32 {
        parsed
            .get(key)
            .and_then(Value::as_f64)
            .map(|value| value.round().clamp(0.0, f64::from(GRADE_MAX)) as u32)
            .unwrap_or(0)
    };
    let summary = parsed
        .get("summary")
        .and_then(Value::as_str)
        .map(|text| truncate_chars(text, AGENT_SUMMARY_MAX_CHARS))
        .unwrap_or_default();
    AgentGrades {
        medallion_architecture: grade("medallion_architecture"),
        sla_logic: grade("sla_logic"),
        pipeline_organization: grade("pipeline_organization"),
        readme_clarity: grade("readme_clarity"),
        code_quality: grade("code_quality"),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedAgent {
        response: Result<&'static str, &'static str>,
    }

    impl Agent for ScriptedAgent {
        fn complete(&self, _prompt: &str) -> Result<String> {
            match self.response {
                Ok(text) => Ok(text.to_string()),
                Err(message) => Err(anyhow!(message)),
            }
        }
    }

    #[test]
    fn grades_parse_and_scale() {
        let agent = ScriptedAgent {
            response: Ok(
                r#"{"medallion_architecture": 5, "sla_logic": 4, "pipeline_organization": 3,
                    "readme_clarity": 2, "code_quality": 1, "summary": "solid pipeline"}"#,
            ),
        };
        let grades = grade_repository(&agent, "evidence").expect("grades");
        assert_eq!(grades.medallion_architecture, 5);
        assert_eq!(grades.code_quality, 1);
        assert_eq!(grades.summary, "solid pipeline");
        assert_eq!(grades.sla_logic * GRADE_SCALE, 80);
    }

    #[test]
    fn markdown_fenced_json_is_accepted() {
        let agent = ScriptedAgent {
            response: Ok("```json\n{\"medallion_architecture\": 4, \"summary\": \"ok\"}\n```"),
        };
        let grades = grade_repository(&agent, "evidence").expect("grades");
        assert_eq!(grades.medallion_architecture, 4);
        // Missing fields default to zero.
        assert_eq!(grades.sla_logic, 0);
    }

    #[test]
    fn out_of_range_grades_are_clamped() {
        let agent = ScriptedAgent {
            response: Ok(r#"{"medallion_architecture": 99, "sla_logic": -3, "summary": 7}"#),
        };
        let grades = grade_repository(&agent, "evidence").expect("grades");
        assert_eq!(grades.medallion_architecture, 5);
        assert_eq!(grades.sla_logic, 0);
        assert_eq!(grades.summary, "");
    }

    #[test]
    fn unreachable_agent_or_garbage_yields_none() {
        let failing = ScriptedAgent {
            response: Err("quota exceeded"),
        };
        assert_eq!(grade_repository(&failing, "evidence"), None);

        let garbage = ScriptedAgent {
            response: Ok("I think the repo is quite nice."),
        };
        assert_eq!(grade_repository(&garbage, "evidence"), None);
    }

    #[test]
    fn run_command_extraction_honors_the_unknown_sentinel() {
        let unsure = ScriptedAgent {
            response: Ok("UNKNOWN"),
        };
        assert_eq!(run_command_from_instructions(&unsure, "## Usage"), None);

        let chatty = ScriptedAgent {
            response: Ok("You should probably use npm start"),
        };
        assert_eq!(run_command_from_instructions(&chatty, "## Usage"), None);

        let helpful = ScriptedAgent {
            response: Ok("python -m src.main\n"),
        };
        assert_eq!(
            run_command_from_instructions(&helpful, "## Usage"),
            Some("python -m src.main".to_string())
        );
    }

    #[test]
    fn empty_instructions_are_never_sent() {
        let agent = ScriptedAgent {
            response: Ok("python main.py"),
        };
        assert_eq!(run_command_from_instructions(&agent, "   "), None);
    }
}
