//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::EvalConfig;
use crate::detectors;
use crate::llm::{Agent, CliAgent};
use crate::report;
use crate::run::evaluate_url;
use crate::scoring::{ScoreCard, compute_dimension_scores};
use crate::security;
use crate::sheet::{REPO_URL_COLUMN, build_result_row, load_input, output_headers, write_results};
use crate::snapshot::Snapshot;
use crate::{cloud, harness};

/// Read the input sheet, evaluate every repository, write the result sheet.
pub fn evaluate_batch(file: &Path, output: &Path, cfg: &EvalConfig) -> Result<()> {
    let sheet = load_input(file).context("load input sheet")?;
    let repo_rows = sheet.repo_rows();
    if repo_rows.is_empty() {
        info!(file = %file.display(), "no rows with {REPO_URL_COLUMN} found");
        return Ok(());
    }

    let agent = CliAgent::from_config(cfg);
    let agent_ref: Option<&dyn Agent> = agent.as_ref().map(|agent| agent as &dyn Agent);

    let mut result_rows = Vec::with_capacity(repo_rows.len());
    for (index, row) in repo_rows.iter().enumerate() {
        let url = row.get(REPO_URL_COLUMN).map(String::as_str).unwrap_or("");
        info!(url, position = index + 1, total = repo_rows.len(), "evaluating repository");
        let evaluation = evaluate_url(url, cfg, agent_ref);
        let passed_checks = evaluation.checks.values().filter(|passed| **passed).count();
        info!(
            final_score = evaluation.card.final_score,
            passed_checks,
            ran = evaluation.outcome.ran,
            "repository evaluated"
        );
        result_rows.push(build_result_row(
            row,
            &evaluation.card,
            &evaluation.summary,
            &evaluation.report,
        ));
    }

    let headers = output_headers(&sheet.headers);
    write_results(&headers, &result_rows, output).context("write results")?;
    println!(
        "evaluate: repos={} output={}",
        result_rows.len(),
        output.display()
    );
    Ok(())
}

/// Run the deterministic engine against a local tree and print the full
/// report. No sandbox execution, no agent.
pub fn inspect_tree(path: &Path) -> Result<()> {
    let snap = Snapshot::new(path);
    let checks = detectors::run_checks(&snap);
    let dimensions = compute_dimension_scores(&checks);
    let cloud_score = if cloud::uses_cloud_ingestion(&snap) { 100 } else { 0 };
    let security_score = security::compute_security_score(&snap);
    let card = ScoreCard::from_signals(
        false,
        harness::gold_has_report(&snap),
        &dimensions,
        cloud_score,
        security_score,
    );
    println!("{}", report::build_report(&checks, &card));
    Ok(())
}

/// Remove the clone cache.
pub fn clean(cfg: &EvalConfig) -> Result<()> {
    let repos_dir = Path::new(&cfg.repos_dir);
    if repos_dir.exists() {
        std::fs::remove_dir_all(repos_dir)
            .with_context(|| format!("remove {}", repos_dir.display()))?;
    }
    println!("clean: removed {}", repos_dir.display());
    Ok(())
}
