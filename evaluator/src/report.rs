//! Deterministic report and summary builders.
//!
//! Both reports are pure functions of check results and scores: no clock, no
//! randomness, no subjective content. The compact variant honors its
//! character budget by construction, never by slicing a line in half.

use crate::detectors::CheckResults;
use crate::registry::{CHECK_REGISTRY, DIMENSIONS, dimension_heading, dimension_title, suggestion_for};
use crate::scoring::{DimensionScores, ScoreCard};
use crate::snapshot::truncate_chars;

/// Hard cap for the short summary string.
pub const SHORT_SUMMARY_MAX_CHARS: usize = 800;

/// Default budget for the compact report.
pub const DEFAULT_REPORT_MAX_CHARS: usize = 1800;

/// Remediation sentences for every failed check, in registry order,
/// deduplicated by check id, plus conditional advice for low derived scores.
pub fn suggested_improvements(checks: &CheckResults, card: &ScoreCard) -> Vec<&'static str> {
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for entry in CHECK_REGISTRY {
        if seen.contains(&entry.check_id) || checks.get(entry.check_id).copied().unwrap_or(true) {
            continue;
        }
        seen.push(entry.check_id);
        if let Some(suggestion) = suggestion_for(entry.check_id) {
            out.push(suggestion);
        }
    }
    if card.cloud_ingestion == 0 {
        out.push("Consider adding cloud ingestion (e.g. Azure Blob) for production-style pipelines.");
    }
    if card.security_practices_score < 50 {
        out.push(
            "Move hardcoded credentials to environment variables and ensure .env is in .gitignore.",
        );
    }
    if card.sensitive_data_exposure_score < 100 {
        out.push(
            "Remove emails or other PII from source files; use config or environment variables for sensitive data.",
        );
    }
    out
}

/// Build the short deterministic summary: check count, per-dimension scores,
/// and the execution outcome, hard-capped at [`SHORT_SUMMARY_MAX_CHARS`].
pub fn build_summary(
    checks: &CheckResults,
    dimensions: &DimensionScores,
    pipeline_runs: bool,
    gold_generated: bool,
    run_error: Option<&str>,
) -> String {
    let mut parts = Vec::new();
    if let Some(error) = run_error
        && !pipeline_runs
    {
        parts.push(format!("Pipeline error: {}.", truncate_chars(error, 200)));
    }
    let passed = checks.values().filter(|passed| **passed).count();
    parts.push(format!(
        "Deterministic evaluation: {passed}/{} checks passed.",
        checks.len()
    ));
    for (dimension, score) in dimensions {
        parts.push(format!("{dimension}: {score}/100."));
    }
    if pipeline_runs && gold_generated {
        parts.push("Pipeline ran successfully; gold layer and reports generated.".to_string());
    } else if pipeline_runs {
        parts.push("Pipeline ran; gold/reports not verified.".to_string());
    }
    truncate_chars(&parts.join(" "), SHORT_SUMMARY_MAX_CHARS)
}

/// Build the full (uncapped) structured evaluation report.
pub fn build_report(checks: &CheckResults, card: &ScoreCard) -> String {
    let mut lines: Vec<String> = Vec::new();
    let passed = checks.values().filter(|passed| **passed).count();

    lines.push("## Executive summary".to_string());
    lines.push(String::new());
    lines.push(format!(
        "Final score: {}/100. Pipeline ran: {}. Gold layer/reports generated: {}.",
        card.final_score,
        yes_no(card.pipeline_runs),
        yes_no(card.gold_generated),
    ));
    lines.push(format!(
        "Presence-based checks: {passed}/{} passed. All scores are computed from these checks and fixed weights.",
        checks.len()
    ));
    lines.push(String::new());

    for &dimension in DIMENSIONS {
        lines.push(format!("## {}", dimension_heading(dimension)));
        lines.push(String::new());
        for (check_id, ok) in dimension_checks(dimension, checks) {
            lines.push(format!("- {check_id}: {}", pass_fail(ok)));
        }
        lines.push(String::new());
    }

    lines.push("## Cloud ingestion & security".to_string());
    lines.push(String::new());
    lines.push(format!(
        "- cloud_ingestion score: {}/100 (100 if Azure/cloud ingestion detected, else 0).",
        card.cloud_ingestion
    ));
    lines.push(format!(
        "- security_practices_score: {}/100 (from credential and .gitignore checks).",
        card.security_practices_score
    ));
    lines.push(format!(
        "- sensitive_data_exposure_score: {}/100 (no email/phone PII in source or non-gitignored medallion data files).",
        card.sensitive_data_exposure_score
    ));
    lines.push(String::new());

    lines.push("## Score justification (presence-based)".to_string());
    lines.push(String::new());
    lines.push(
        "Each dimension score = 100 * (sum of weights for passed checks) / (sum of weights for that dimension)."
            .to_string(),
    );
    for &dimension in DIMENSIONS {
        lines.push(format!("- {dimension}: {}/100", card.dimension(dimension)));
    }
    lines.push(String::new());
    lines.push("No subjective scoring; identical repository structure yields identical scores.".to_string());

    let suggestions = suggested_improvements(checks, card);
    if !suggestions.is_empty() {
        lines.push(String::new());
        lines.push("## Suggested Improvements".to_string());
        lines.push(String::new());
        for suggestion in suggestions {
            lines.push(format!("- {suggestion}"));
        }
    }
    lines.join("\n")
}

/// Build the compact report, never exceeding `max_chars`.
///
/// Lines are appended only while the joined total stays within budget; the
/// first refused dimension or suggestion line stops its section. Nothing is
/// ever cut mid-line.
pub fn build_report_compact(checks: &CheckResults, card: &ScoreCard, max_chars: usize) -> String {
    let mut report = BudgetedReport::new(max_chars);
    let passed = checks.values().filter(|passed| **passed).count();

    report.push(&format!(
        "Final score: {}/100. Pipeline ran: {}. Gold generated: {}.",
        card.final_score,
        yes_no(card.pipeline_runs),
        yes_no(card.gold_generated),
    ));
    report.push(&format!("Checks: {passed}/{} passed.", checks.len()));
    report.push("");

    for &dimension in DIMENSIONS {
        let flags: Vec<String> = dimension_checks(dimension, checks)
            .into_iter()
            .map(|(check_id, ok)| format!("{check_id}={}", if ok { "P" } else { "F" }))
            .collect();
        let line = format!(
            "{} ({}/100): {}",
            dimension_title(dimension),
            card.dimension(dimension),
            flags.join(", ")
        );
        if !report.push(&line) {
            break;
        }
    }
    report.push("");
    report.push(&format!(
        "Cloud: {}/100. Security: {}/100. PII: {}/100.",
        card.cloud_ingestion, card.security_practices_score, card.sensitive_data_exposure_score,
    ));
    report.push("Scores from presence checks only; no subjective scoring.");

    let suggestions = suggested_improvements(checks, card);
    if !suggestions.is_empty() {
        report.push("");
        report.push("## Suggested Improvements");
        report.push("");
        for suggestion in suggestions {
            if !report.push(&format!("- {suggestion}")) {
                break;
            }
        }
    }
    report.finish()
}

fn dimension_checks(dimension: &str, checks: &CheckResults) -> Vec<(&'static str, bool)> {
    CHECK_REGISTRY
        .iter()
        .filter(|entry| entry.dimension == dimension)
        .map(|entry| {
            (
                entry.check_id,
                checks.get(entry.check_id).copied().unwrap_or(false),
            )
        })
        .collect()
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn pass_fail(flag: bool) -> &'static str {
    if flag { "Pass" } else { "Fail" }
}

/// Line accumulator that refuses any line pushing the joined total past the
/// budget.
struct BudgetedReport {
    lines: Vec<String>,
    used_chars: usize,
    max_chars: usize,
}

impl BudgetedReport {
    fn new(max_chars: usize) -> Self {
        Self {
            lines: Vec::new(),
            used_chars: 0,
            max_chars,
        }
    }

    fn push(&mut self, line: &str) -> bool {
        let line_chars = line.chars().count();
        let candidate = if self.lines.is_empty() {
            line_chars
        } else {
            // +1 for the joining newline
            self.used_chars + 1 + line_chars
        };
        if candidate > self.max_chars {
            return false;
        }
        self.used_chars = candidate;
        self.lines.push(line.to_string());
        true
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::compute_dimension_scores;

    fn all_checks(passed: bool) -> CheckResults {
        CHECK_REGISTRY
            .iter()
            .map(|entry| (entry.check_id, passed))
            .collect()
    }

    fn sample_card(checks: &CheckResults) -> ScoreCard {
        let dims = compute_dimension_scores(checks);
        ScoreCard::from_signals(true, true, &dims, 0, 70)
    }

    #[test]
    fn summary_contains_counts_and_scores() {
        let checks = all_checks(true);
        let dims = compute_dimension_scores(&checks);
        let summary = build_summary(&checks, &dims, true, true, None);
        assert!(summary.contains("26/26 checks passed"));
        assert!(summary.contains("medallion_architecture: 100/100."));
        assert!(summary.contains("gold layer and reports generated"));
        assert!(summary.chars().count() <= SHORT_SUMMARY_MAX_CHARS);
    }

    #[test]
    fn summary_leads_with_the_run_error() {
        let checks = all_checks(false);
        let dims = compute_dimension_scores(&checks);
        let summary = build_summary(&checks, &dims, false, false, Some("Docker not found"));
        assert!(summary.starts_with("Pipeline error: Docker not found."));
    }

    #[test]
    fn full_report_has_fixed_sections_and_is_deterministic() {
        let mut checks = all_checks(false);
        checks.insert("has_raw_layer", true);
        let card = sample_card(&checks);
        let report = build_report(&checks, &card);

        assert!(report.contains("## Executive summary"));
        assert!(report.contains("## Architecture (medallion layers)"));
        assert!(report.contains("## Sensitive data (PII)"));
        assert!(report.contains("## Score justification (presence-based)"));
        assert!(report.contains("No subjective scoring"));
        assert!(report.contains("## Suggested Improvements"));
        // has_raw_layer passed, so its suggestion is absent
        assert!(!report.contains("Add a raw layer"));
        assert!(report.contains("Add a bronze layer"));

        assert_eq!(report, build_report(&checks, &card));
    }

    #[test]
    fn compact_report_honors_budgets_without_cutting_lines() {
        let checks = all_checks(true);
        let card = sample_card(&checks);
        let full = build_report_compact(&checks, &card, usize::MAX);

        for max_chars in [1800, 500, 300] {
            let report = build_report_compact(&checks, &card, max_chars);
            assert!(
                report.chars().count() <= max_chars,
                "length {} > {max_chars}",
                report.chars().count()
            );
            // Every emitted line is a complete line of the unbudgeted report.
            for line in report.lines() {
                assert!(full.lines().any(|candidate| candidate == line), "cut line: {line}");
            }
            assert_eq!(report, build_report_compact(&checks, &card, max_chars));
        }
    }

    #[test]
    fn compact_report_mentions_scores_and_cloud_suggestion() {
        let checks = all_checks(true);
        let card = sample_card(&checks);
        let report = build_report_compact(&checks, &card, 1800);
        assert!(report.contains("Final score"));
        assert!(report.contains("Cloud: 0/100."));
        // cloud_ingestion is 0, so the cloud suggestion appears
        assert!(report.contains("Suggested Improvements"));
        assert!(report.contains("cloud ingestion"));
    }

    #[test]
    fn suggestions_follow_registry_order_and_thresholds() {
        let checks = all_checks(true);
        let card = ScoreCard::from_signals(
            true,
            true,
            &compute_dimension_scores(&checks),
            100,
            80,
        );
        assert!(suggested_improvements(&checks, &card).is_empty());

        let failed = all_checks(false);
        let low_card = ScoreCard::from_signals(
            false,
            false,
            &compute_dimension_scores(&failed),
            0,
            40,
        );
        let suggestions = suggested_improvements(&failed, &low_card);
        assert_eq!(suggestions.first().copied(), suggestion_for("has_raw_layer"));
        assert!(suggestions.iter().any(|s| s.contains("cloud ingestion")));
        assert!(suggestions.iter().any(|s| s.contains("hardcoded credentials")));
    }
}
