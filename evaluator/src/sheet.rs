//! Spreadsheet collaborator: CSV input and output.
//!
//! Input is a CSV with a `repo_url` column; any extra columns are preserved
//! on the output row. Output carries the original columns followed by the
//! fixed result columns, every one present even when a stage failed.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::scoring::ScoreCard;

/// Column holding the repository URL on the input sheet.
pub const REPO_URL_COLUMN: &str = "repo_url";

/// Result columns, fixed order.
pub const RESULT_COLUMNS: &[&str] = &[
    "pipeline_runs",
    "gold_generated",
    "medallion_architecture",
    "sla_logic",
    "pipeline_organization",
    "readme_clarity",
    "code_quality",
    "cloud_ingestion",
    "naming_conventions_score",
    "security_practices_score",
    "sensitive_data_exposure_score",
    "final_score",
    "summary",
    "evaluation_report",
];

/// One spreadsheet row as column name to value.
pub type Row = BTreeMap<String, String>;

/// Parsed input sheet: header order plus rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl InputSheet {
    /// Rows with a non-empty repository URL.
    pub fn repo_rows(&self) -> Vec<&Row> {
        self.rows
            .iter()
            .filter(|row| {
                row.get(REPO_URL_COLUMN)
                    .is_some_and(|url| !url.trim().is_empty())
            })
            .collect()
    }
}

/// Load the input sheet; the `repo_url` column is required.
pub fn load_input(path: &Path) -> Result<InputSheet> {
    if !path.exists() {
        bail!("input file not found: {}", path.display());
    }
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open input {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("read input headers")?
        .iter()
        .map(ToString::to_string)
        .collect();
    if !headers.iter().any(|header| header == REPO_URL_COLUMN) {
        bail!("missing required column: {REPO_URL_COLUMN}");
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("read input record")?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(InputSheet { headers, rows })
}

/// Merge the original row with the result columns; results override.
pub fn build_result_row(original: &Row, card: &ScoreCard, summary: &str, report: &str) -> Row {
    let mut row = original.clone();
    row.insert("pipeline_runs".to_string(), card.pipeline_runs.to_string());
    row.insert("gold_generated".to_string(), card.gold_generated.to_string());
    row.insert(
        "medallion_architecture".to_string(),
        card.medallion_architecture.to_string(),
    );
    row.insert("sla_logic".to_string(), card.sla_logic.to_string());
    row.insert(
        "pipeline_organization".to_string(),
        card.pipeline_organization.to_string(),
    );
    row.insert("readme_clarity".to_string(), card.readme_clarity.to_string());
    row.insert("code_quality".to_string(), card.code_quality.to_string());
    row.insert("cloud_ingestion".to_string(), card.cloud_ingestion.to_string());
    row.insert(
        "naming_conventions_score".to_string(),
        card.naming_conventions_score.to_string(),
    );
    row.insert(
        "security_practices_score".to_string(),
        card.security_practices_score.to_string(),
    );
    row.insert(
        "sensitive_data_exposure_score".to_string(),
        card.sensitive_data_exposure_score.to_string(),
    );
    row.insert("final_score".to_string(), format!("{:.2}", card.final_score));
    row.insert("summary".to_string(), summary.to_string());
    row.insert("evaluation_report".to_string(), report.to_string());
    row
}

/// Output header order: original columns first, then the result columns.
pub fn output_headers(input_headers: &[String]) -> Vec<String> {
    let mut headers: Vec<String> = input_headers
        .iter()
        .filter(|header| !RESULT_COLUMNS.contains(&header.as_str()))
        .cloned()
        .collect();
    headers.extend(RESULT_COLUMNS.iter().map(ToString::to_string));
    headers
}

/// Write result rows to a CSV file, creating parent directories if needed.
pub fn write_results(headers: &[String], rows: &[Row], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("open output {}", path.display()))?;
    writer.write_record(headers).context("write headers")?;
    for row in rows {
        let record: Vec<&str> = headers
            .iter()
            .map(|header| row.get(header).map(String::as_str).unwrap_or(""))
            .collect();
        writer.write_record(&record).context("write record")?;
    }
    writer.flush().context("flush output")?;
    info!(path = %path.display(), rows = rows.len(), "wrote results");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_requires_the_url_column() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("input.csv");
        fs::write(&path, "name,notes\nfoo,bar\n").expect("write");
        let err = load_input(&path).unwrap_err();
        assert!(err.to_string().contains("repo_url"));
    }

    #[test]
    fn rows_without_urls_are_skipped() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("input.csv");
        fs::write(
            &path,
            "team,repo_url\nalpha,https://github.com/a/one\nbeta,\n",
        )
        .expect("write");
        let sheet = load_input(&path).expect("load");
        assert_eq!(sheet.rows.len(), 2);
        let repo_rows = sheet.repo_rows();
        assert_eq!(repo_rows.len(), 1);
        assert_eq!(
            repo_rows[0].get("repo_url").map(String::as_str),
            Some("https://github.com/a/one")
        );
    }

    #[test]
    fn result_row_has_every_result_column() {
        let original = Row::from([
            ("team".to_string(), "alpha".to_string()),
            ("repo_url".to_string(), "https://github.com/a/one".to_string()),
        ]);
        let row = build_result_row(&original, &ScoreCard::zeroed(), "summary", "report");
        for column in RESULT_COLUMNS {
            assert!(row.contains_key(*column), "missing {column}");
        }
        assert_eq!(row.get("final_score").map(String::as_str), Some("0.00"));
        assert_eq!(row.get("team").map(String::as_str), Some("alpha"));
    }

    #[test]
    fn write_then_read_round_trips() {
        let temp = tempdir().expect("tempdir");
        let input = temp.path().join("input.csv");
        fs::write(&input, "repo_url,team\nhttps://github.com/a/one,alpha\n").expect("write");
        let sheet = load_input(&input).expect("load");

        let headers = output_headers(&sheet.headers);
        assert_eq!(headers[0], "repo_url");
        assert_eq!(headers[1], "team");
        assert_eq!(headers.last().map(String::as_str), Some("evaluation_report"));

        let row = build_result_row(&sheet.rows[0], &ScoreCard::zeroed(), "all zero", "report");
        let output = temp.path().join("out/results.csv");
        write_results(&headers, &[row], &output).expect("write results");

        let written = fs::read_to_string(&output).expect("read output");
        assert!(written.starts_with("repo_url,team,pipeline_runs"));
        assert!(written.contains("all zero"));
    }
}
