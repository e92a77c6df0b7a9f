//! Per-repository evaluation orchestration.
//!
//! Strictly sequential stages: clone, execute, detect, score, report. Every
//! stage degrades to a neutral result on collaborator failure, so one
//! repository can never abort the batch.

use std::path::Path;

use tracing::{info, instrument, warn};

use crate::clone;
use crate::cloud;
use crate::config::EvalConfig;
use crate::context;
use crate::detectors::{self, CheckResults};
use crate::entrypoint;
use crate::harness::{self, ExecutionOutcome};
use crate::llm::{self, Agent, GRADE_SCALE};
use crate::report;
use crate::scoring::{self, ScoreCard};
use crate::security;
use crate::snapshot::{CONTENT_READ_CAP, Snapshot};

/// Everything produced for one repository.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub checks: CheckResults,
    pub outcome: ExecutionOutcome,
    pub card: ScoreCard,
    pub summary: String,
    pub report: String,
}

/// Clone and evaluate one repository URL.
///
/// A failed clone short-circuits to an all-zero scorecard with an
/// explanatory summary; it never errors the batch.
#[instrument(skip_all, fields(url = %url))]
pub fn evaluate_url(url: &str, cfg: &EvalConfig, agent: Option<&dyn Agent>) -> Evaluation {
    let base = Path::new(&cfg.repos_dir);
    match clone::clone_repo(url, base, true) {
        Some(path) => evaluate_tree(&Snapshot::new(path), cfg, agent),
        None => {
            warn!(url, "clone failed, recording all-zero evaluation");
            unevaluated(format!("Clone failed for {url}; repository not evaluated."))
        }
    }
}

/// Evaluate an already-materialized repository tree.
#[instrument(skip_all, fields(repo = %snap.root().display()))]
pub fn evaluate_tree(snap: &Snapshot, cfg: &EvalConfig, agent: Option<&dyn Agent>) -> Evaluation {
    if detectors::is_effectively_empty(snap) {
        return unevaluated("Repository is empty; nothing to evaluate.".to_string());
    }

    let command = entrypoint::resolve_command(
        snap.root(),
        cfg.run_command.as_deref(),
        cfg.prefer_instruction_command,
        || {
            agent.and_then(|agent| {
                let readme = snap.read_capped("README.md", CONTENT_READ_CAP);
                llm::run_command_from_instructions(agent, &readme)
            })
        },
    );
    let outcome = harness::run_pipeline(snap, command.as_deref(), cfg);

    let checks = detectors::run_checks(snap);
    let dimensions = scoring::compute_dimension_scores(&checks);
    let cloud_score = if cloud::uses_cloud_ingestion(snap) { 100 } else { 0 };
    let security_score = security::compute_security_score(snap);

    let mut card = ScoreCard::from_signals(
        outcome.ran,
        outcome.gold_artifact_present,
        &dimensions,
        cloud_score,
        security_score,
    );

    let deterministic_summary = report::build_summary(
        &checks,
        &dimensions,
        outcome.ran,
        outcome.gold_artifact_present,
        outcome.error.as_deref(),
    );

    // Agent grades, when available, take over the subjective dimensions;
    // otherwise the deterministic scores stand.
    let mut summary = deterministic_summary;
    if let Some(agent) = agent {
        let evidence = context::collect_evidence(snap, &outcome);
        if let Some(grades) = llm::grade_repository(agent, &context::evidence_to_string(&evidence)) {
            card.medallion_architecture = grades.medallion_architecture * GRADE_SCALE;
            card.sla_logic = grades.sla_logic * GRADE_SCALE;
            card.pipeline_organization = grades.pipeline_organization * GRADE_SCALE;
            card.readme_clarity = grades.readme_clarity * GRADE_SCALE;
            card.code_quality = grades.code_quality * GRADE_SCALE;
            card.refresh_final_score();
            if !grades.summary.trim().is_empty() {
                summary = grades.summary;
            }
        }
    }

    let compact_report = report::build_report_compact(&checks, &card, cfg.summary_max_chars);
    info!(final_score = card.final_score, ran = outcome.ran, "evaluation complete");

    Evaluation {
        checks,
        outcome,
        card,
        summary,
        report: compact_report,
    }
}

/// All-zero evaluation for repositories that never reached the detectors.
fn unevaluated(summary: String) -> Evaluation {
    let checks: CheckResults = crate::registry::CHECK_REGISTRY
        .iter()
        .map(|entry| (entry.check_id, false))
        .collect();
    let card = ScoreCard::zeroed();
    let compact_report = report::build_report_compact(&checks, &card, report::DEFAULT_REPORT_MAX_CHARS);
    Evaluation {
        checks,
        outcome: ExecutionOutcome {
            ran: false,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            gold_artifact_present: false,
            error: Some(summary.clone()),
        },
        card,
        summary,
        report: compact_report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CHECK_REGISTRY;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    struct ScriptedAgent {
        response: &'static str,
    }

    impl Agent for ScriptedAgent {
        fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.response.to_string())
        }
    }

    // Fixtures never create an entrypoint, so no container is ever spawned.
    fn no_sandbox_config() -> EvalConfig {
        EvalConfig::default()
    }

    #[test]
    fn empty_tree_scores_zero_everywhere() {
        let temp = tempdir().expect("tempdir");
        let evaluation = evaluate_tree(&Snapshot::new(temp.path()), &no_sandbox_config(), None);
        assert_eq!(evaluation.checks.len(), CHECK_REGISTRY.len());
        assert!(evaluation.checks.values().all(|passed| !passed));
        assert_eq!(evaluation.card, ScoreCard::zeroed());
        assert_eq!(evaluation.card.final_score, 0.0);
        assert!(evaluation.summary.contains("empty"));
    }

    #[test]
    fn structured_repo_without_entrypoint_still_gets_scores() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("data/raw")).expect("dirs");
        fs::create_dir_all(temp.path().join("data/gold")).expect("dirs");
        fs::write(temp.path().join("README.md"), "# Usage\nrun the pipeline").expect("readme");
        fs::write(temp.path().join("notes.txt"), "no entrypoint here").expect("notes");

        let evaluation = evaluate_tree(&Snapshot::new(temp.path()), &no_sandbox_config(), None);
        assert!(!evaluation.outcome.ran);
        assert!(
            evaluation
                .outcome
                .error
                .as_deref()
                .unwrap_or("")
                .contains("No main.py")
        );
        assert_eq!(evaluation.card.medallion_architecture, 40);
        assert!(evaluation.card.readme_clarity > 0);
        assert!(evaluation.report.chars().count() <= 1800);
    }

    #[test]
    fn agent_grades_override_subjective_dimensions() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("README.md"), "plain").expect("readme");

        let agent = ScriptedAgent {
            response: r#"{"medallion_architecture": 5, "sla_logic": 5, "pipeline_organization": 5,
                          "readme_clarity": 5, "code_quality": 5, "summary": "agent verdict"}"#,
        };
        let evaluation = evaluate_tree(&Snapshot::new(temp.path()), &no_sandbox_config(), Some(&agent));
        assert_eq!(evaluation.card.medallion_architecture, 100);
        assert_eq!(evaluation.card.code_quality, 100);
        assert_eq!(evaluation.summary, "agent verdict");
        // Deterministic columns are untouched by the agent.
        assert_eq!(evaluation.card.cloud_ingestion, 0);
    }

    #[test]
    fn malformed_agent_response_falls_back_to_deterministic_scores() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("README.md"), "plain").expect("readme");

        let agent = ScriptedAgent {
            response: "the repository is delightful",
        };
        let without_agent = evaluate_tree(&Snapshot::new(temp.path()), &no_sandbox_config(), None);
        let with_agent =
            evaluate_tree(&Snapshot::new(temp.path()), &no_sandbox_config(), Some(&agent));
        assert_eq!(with_agent.card, without_agent.card);
        assert_eq!(with_agent.summary, without_agent.summary);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("data/gold")).expect("dirs");
        fs::write(temp.path().join("data/gold/report.csv"), "a\n1\n").expect("csv");
        fs::write(temp.path().join("README.md"), "x".repeat(300)).expect("readme");

        let snap = Snapshot::new(temp.path());
        let first = evaluate_tree(&snap, &no_sandbox_config(), None);
        let second = evaluate_tree(&snap, &no_sandbox_config(), None);
        assert_eq!(first.checks, second.checks);
        assert_eq!(first.card, second.card);
        assert_eq!(first.report, second.report);
    }
}
