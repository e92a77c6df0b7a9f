//! Dimension scoring and final aggregation.
//!
//! Dimension scores are computed from check results and the fixed registry
//! weights; the final score is the arithmetic mean of the output score
//! columns. There is no other scoring formula: identical check results always
//! produce identical scores.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::detectors::CheckResults;
use crate::registry::CHECK_REGISTRY;

/// Score per dimension, 0-100.
pub type DimensionScores = BTreeMap<&'static str, u32>;

/// Dimension with all-or-nothing scoring: any PII exposure zeroes it.
const GATED_DIMENSION: &str = "sensitive_data_exposure_score";

/// Compute the 0-100 score per dimension from check results.
///
/// `score = round(100 * passed_weight / total_weight)`, rounding half away
/// from zero. A dimension with zero total weight scores 0. The sensitive-data
/// dimension is gated: one failed check zeroes it regardless of weights.
pub fn compute_dimension_scores(checks: &CheckResults) -> DimensionScores {
    let mut totals: BTreeMap<&'static str, u32> = BTreeMap::new();
    let mut earned: BTreeMap<&'static str, u32> = BTreeMap::new();
    let mut gated_failure = false;

    for entry in CHECK_REGISTRY {
        *totals.entry(entry.dimension).or_insert(0) += entry.weight;
        let passed = checks.get(entry.check_id).copied().unwrap_or(false);
        if passed {
            *earned.entry(entry.dimension).or_insert(0) += entry.weight;
        } else if entry.dimension == GATED_DIMENSION {
            gated_failure = true;
        }
    }

    totals
        .into_iter()
        .map(|(dimension, total)| {
            let score = if total == 0 || (dimension == GATED_DIMENSION && gated_failure) {
                0
            } else {
                let earned = earned.get(dimension).copied().unwrap_or(0);
                (100.0 * f64::from(earned) / f64::from(total)).round() as u32
            };
            (dimension, score)
        })
        .collect()
}

/// All column scores for one evaluated repository.
///
/// Assembled once per repository, serialized to the output record, then
/// discarded. Field set is fixed so a missing column is a compile error, not
/// a silently defaulted key.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScoreCard {
    pub pipeline_runs: bool,
    pub gold_generated: bool,
    pub medallion_architecture: u32,
    pub sla_logic: u32,
    pub pipeline_organization: u32,
    pub readme_clarity: u32,
    pub code_quality: u32,
    pub cloud_ingestion: u32,
    pub naming_conventions_score: u32,
    pub security_practices_score: u32,
    pub sensitive_data_exposure_score: u32,
    pub final_score: f64,
}

impl ScoreCard {
    /// Card for a repository that could not be evaluated at all.
    pub fn zeroed() -> Self {
        Self {
            pipeline_runs: false,
            gold_generated: false,
            medallion_architecture: 0,
            sla_logic: 0,
            pipeline_organization: 0,
            readme_clarity: 0,
            code_quality: 0,
            cloud_ingestion: 0,
            naming_conventions_score: 0,
            security_practices_score: 0,
            sensitive_data_exposure_score: 0,
            final_score: 0.0,
        }
    }

    /// Assemble a card from the evaluation signals. `final_score` is filled
    /// from the mean of the column scores.
    pub fn from_signals(
        pipeline_runs: bool,
        gold_generated: bool,
        dimensions: &DimensionScores,
        cloud_ingestion: u32,
        security_practices_score: u32,
    ) -> Self {
        let dim = |name: &str| dimensions.get(name).copied().unwrap_or(0);
        let mut card = Self {
            pipeline_runs,
            gold_generated,
            medallion_architecture: dim("medallion_architecture"),
            sla_logic: dim("sla_logic"),
            pipeline_organization: dim("pipeline_organization"),
            readme_clarity: dim("readme_clarity"),
            code_quality: dim("code_quality"),
            cloud_ingestion,
            naming_conventions_score: dim("naming_conventions_score"),
            security_practices_score,
            sensitive_data_exposure_score: dim("sensitive_data_exposure_score"),
            final_score: 0.0,
        };
        card.refresh_final_score();
        card
    }

    /// Recompute `final_score` from the current column values.
    pub fn refresh_final_score(&mut self) {
        let columns: Vec<Option<f64>> = self.column_scores().into_iter().map(Some).collect();
        self.final_score = compute_final_score(&columns);
    }

    /// Column scores in output order, booleans mapped to 0/100.
    pub fn column_scores(&self) -> [f64; 11] {
        [
            if self.pipeline_runs { 100.0 } else { 0.0 },
            if self.gold_generated { 100.0 } else { 0.0 },
            f64::from(self.medallion_architecture),
            f64::from(self.sla_logic),
            f64::from(self.pipeline_organization),
            f64::from(self.readme_clarity),
            f64::from(self.code_quality),
            f64::from(self.cloud_ingestion),
            f64::from(self.naming_conventions_score),
            f64::from(self.security_practices_score),
            f64::from(self.sensitive_data_exposure_score),
        ]
    }

    /// Dimension score by registry name.
    pub fn dimension(&self, name: &str) -> u32 {
        match name {
            "medallion_architecture" => self.medallion_architecture,
            "sla_logic" => self.sla_logic,
            "pipeline_organization" => self.pipeline_organization,
            "readme_clarity" => self.readme_clarity,
            "code_quality" => self.code_quality,
            "naming_conventions_score" => self.naming_conventions_score,
            "sensitive_data_exposure_score" => self.sensitive_data_exposure_score,
            _ => 0,
        }
    }
}

/// Final score = arithmetic mean of the present column scores, rounded to
/// two decimals. Absent columns are excluded from both the sum and the count.
pub fn compute_final_score(columns: &[Option<f64>]) -> f64 {
    let mut total = 0.0;
    let mut count = 0u32;
    for column in columns.iter().flatten() {
        total += column.clamp(0.0, 100.0);
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    round2(total / f64::from(count))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DIMENSIONS;

    fn all_checks(passed: bool) -> CheckResults {
        CHECK_REGISTRY
            .iter()
            .map(|entry| (entry.check_id, passed))
            .collect()
    }

    #[test]
    fn all_passed_scores_one_hundred_everywhere() {
        let scores = compute_dimension_scores(&all_checks(true));
        for dimension in DIMENSIONS {
            assert_eq!(scores[dimension], 100, "dimension {dimension}");
        }
    }

    #[test]
    fn all_failed_scores_zero_everywhere() {
        let scores = compute_dimension_scores(&all_checks(false));
        for dimension in DIMENSIONS {
            assert_eq!(scores[dimension], 0, "dimension {dimension}");
        }
    }

    #[test]
    fn partial_medallion_architecture_is_weighted() {
        let mut checks = all_checks(false);
        checks.insert("has_raw_layer", true);
        checks.insert("has_bronze_layer", true);
        let scores = compute_dimension_scores(&checks);
        assert_eq!(scores["medallion_architecture"], 40);
    }

    #[test]
    fn flipping_a_check_to_pass_never_decreases_its_dimension() {
        let base = all_checks(false);
        let base_scores = compute_dimension_scores(&base);
        for entry in CHECK_REGISTRY {
            let mut flipped = base.clone();
            flipped.insert(entry.check_id, true);
            let scores = compute_dimension_scores(&flipped);
            assert!(
                scores[entry.dimension] >= base_scores[entry.dimension],
                "check {}",
                entry.check_id
            );
        }
    }

    #[test]
    fn pii_exposure_zeroes_the_sensitive_data_dimension() {
        let mut checks = all_checks(true);
        checks.insert("no_pii_in_source_files", false);
        let scores = compute_dimension_scores(&checks);
        assert_eq!(scores["sensitive_data_exposure_score"], 0);
    }

    #[test]
    fn weight_conservation_round_trips() {
        let mut checks = all_checks(false);
        checks.insert("has_src_or_ingestion_structure", true);
        checks.insert("has_docstrings_or_type_hints", true);
        let scores = compute_dimension_scores(&checks);
        // 34 + 33 of 100
        assert_eq!(scores["code_quality"], 67);
    }

    #[test]
    fn final_score_is_the_mean_of_columns() {
        let columns: Vec<Option<f64>> =
            [100.0, 0.0, 80.0, 60.0, 100.0, 40.0, 20.0, 0.0, 100.0, 100.0, 0.0]
                .into_iter()
                .map(Some)
                .collect();
        let score = compute_final_score(&columns);
        assert_eq!(score, (600.0f64 / 11.0 * 100.0).round() / 100.0);
        assert_eq!(score, 54.55);
    }

    #[test]
    fn absent_columns_are_excluded_from_the_mean() {
        let columns = vec![Some(100.0), None, Some(50.0)];
        assert_eq!(compute_final_score(&columns), 75.0);
    }

    #[test]
    fn no_columns_means_zero() {
        assert_eq!(compute_final_score(&[]), 0.0);
    }

    #[test]
    fn scorecard_assembles_and_aggregates() {
        let mut checks = all_checks(true);
        checks.insert("gold_has_parquet", false);
        let dims = compute_dimension_scores(&checks);
        let card = ScoreCard::from_signals(true, true, &dims, 100, 95);
        assert_eq!(card.sla_logic, 80);
        assert_eq!(card.sensitive_data_exposure_score, 100);
        let expected: f64 = card.column_scores().iter().sum::<f64>() / 11.0;
        assert_eq!(card.final_score, (expected * 100.0).round() / 100.0);
    }

    #[test]
    fn zeroed_card_has_zero_final_score() {
        let card = ScoreCard::zeroed();
        assert_eq!(card.final_score, 0.0);
        assert!(!card.pipeline_runs);
    }
}
