//! Static check registry: dimensions, weights, and remediation advice.
//!
//! The registry is the single source of truth for which checks exist and how
//! they weigh into each dimension score. Weights within a dimension are
//! normalized to 0-100, so the same repository structure always earns the
//! same score.

/// One registered check: the dimension it belongs to, its stable id, and its
/// weight within that dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub dimension: &'static str,
    pub check_id: &'static str,
    pub weight: u32,
}

const fn entry(dimension: &'static str, check_id: &'static str, weight: u32) -> RegistryEntry {
    RegistryEntry {
        dimension,
        check_id,
        weight,
    }
}

/// Ordered registry of all checks. A check id appears exactly once.
pub const CHECK_REGISTRY: &[RegistryEntry] = &[
    // Medallion architecture (5 checks, 20 each)
    entry("medallion_architecture", "has_raw_layer", 20),
    entry("medallion_architecture", "has_bronze_layer", 20),
    entry("medallion_architecture", "has_silver_layer", 20),
    entry("medallion_architecture", "has_gold_layer", 20),
    entry("medallion_architecture", "pipeline_orchestrates_layers", 20),
    // SLA logic (5 checks, 20 each)
    entry("sla_logic", "has_sla_calculation_file", 20),
    entry("sla_logic", "gold_has_csv_reports", 20),
    entry("sla_logic", "gold_has_parquet", 20),
    entry("sla_logic", "code_references_business_hours_or_sla", 20),
    entry("sla_logic", "gold_has_sla_related_columns", 20),
    // Pipeline organization (4 checks, 25 each)
    entry("pipeline_organization", "has_main_or_run_pipeline", 25),
    entry("pipeline_organization", "has_requirements_txt", 25),
    entry("pipeline_organization", "has_config_or_env_example", 25),
    entry("pipeline_organization", "has_clear_entrypoint", 25),
    // Readme clarity (3 checks: 40, 30, 30)
    entry("readme_clarity", "has_readme", 40),
    entry("readme_clarity", "readme_mentions_run_or_usage", 30),
    entry("readme_clarity", "readme_substantive", 30),
    // Code quality (3 checks: 34, 33, 33)
    entry("code_quality", "has_src_or_ingestion_structure", 34),
    entry("code_quality", "has_docstrings_or_type_hints", 33),
    entry("code_quality", "no_hardcoded_credentials_in_code", 33),
    // Naming (4 checks, 25 each)
    entry("naming_conventions_score", "folders_lowercase_or_snake", 25),
    entry("naming_conventions_score", "python_files_snake_case", 25),
    entry("naming_conventions_score", "data_paths_use_layer_names", 25),
    entry("naming_conventions_score", "has_common_folders", 25),
    // Sensitive data exposure (2 checks, 50 each)
    entry("sensitive_data_exposure_score", "no_pii_in_source_files", 50),
    entry("sensitive_data_exposure_score", "no_pii_in_medallion_data_files", 50),
];

/// Dimensions in report order.
pub const DIMENSIONS: &[&str] = &[
    "medallion_architecture",
    "sla_logic",
    "pipeline_organization",
    "readme_clarity",
    "code_quality",
    "naming_conventions_score",
    "sensitive_data_exposure_score",
];

/// Short section title used by the compact report.
pub fn dimension_title(dimension: &str) -> &'static str {
    match dimension {
        "medallion_architecture" => "Medallion",
        "sla_logic" => "SLA logic",
        "pipeline_organization" => "Pipeline org",
        "readme_clarity" => "Readme",
        "code_quality" => "Code quality",
        "naming_conventions_score" => "Naming",
        "sensitive_data_exposure_score" => "PII",
        _ => "Other",
    }
}

/// Full section heading used by the uncapped report.
pub fn dimension_heading(dimension: &str) -> &'static str {
    match dimension {
        "medallion_architecture" => "Architecture (medallion layers)",
        "sla_logic" => "SLA logic",
        "pipeline_organization" => "Pipeline organization",
        "readme_clarity" => "Readme clarity",
        "code_quality" => "Code quality",
        "naming_conventions_score" => "Naming conventions",
        "sensitive_data_exposure_score" => "Sensitive data (PII)",
        _ => "Other",
    }
}

/// Actionable remediation sentence for a failed check.
pub fn suggestion_for(check_id: &str) -> Option<&'static str> {
    let text = match check_id {
        "has_raw_layer" => {
            "Add a raw layer (e.g. data/raw) to improve traceability and reprocessing capability."
        }
        "has_bronze_layer" => "Add a bronze layer (e.g. data/bronze) for normalized raw data.",
        "has_silver_layer" => "Add a silver layer (e.g. data/silver) for enriched/cleaned data.",
        "has_gold_layer" => {
            "Add a gold layer (e.g. data/gold) for business-ready outputs and reports."
        }
        "pipeline_orchestrates_layers" => {
            "Ensure the main pipeline orchestrates all medallion layers (raw, bronze, silver, gold) in sequence."
        }
        "has_sla_calculation_file" => {
            "Add an SLA calculation module (e.g. sla_calculation.py or src/sla/sla_calculation.py)."
        }
        "gold_has_csv_reports" => {
            "Produce at least one CSV report from the gold layer (e.g. average SLA by analyst or by ticket type)."
        }
        "gold_has_parquet" => {
            "Consider producing Parquet outputs from the gold layer for efficient storage and querying."
        }
        "code_references_business_hours_or_sla" => {
            "Implement or reference business-hours or SLA logic in code (e.g. resolution time in business hours)."
        }
        "gold_has_sla_related_columns" => {
            "Include SLA-related columns in gold outputs (e.g. resolution time, expected SLA, is_sla_met)."
        }
        "has_main_or_run_pipeline" => {
            "Add a clear pipeline entrypoint (main.py or run_pipeline.py)."
        }
        "has_requirements_txt" => "Add requirements.txt for reproducible dependencies.",
        "has_config_or_env_example" => {
            "Add configuration (e.g. config.py, .env.example, or config.yaml) for environment-specific settings."
        }
        "has_clear_entrypoint" => {
            "Ensure a discoverable entrypoint (main.py, run_pipeline.py, or src/main.py)."
        }
        "has_readme" => "Add a README.md with project description and usage.",
        "readme_mentions_run_or_usage" => {
            "Improve README by adding run/usage instructions (e.g. how to run the pipeline)."
        }
        "readme_substantive" => {
            "Improve README with more substantive content (e.g. pipeline architecture section and execution instructions)."
        }
        "has_src_or_ingestion_structure" => {
            "Organize code under src/ or ingestion/ for clearer structure."
        }
        "has_docstrings_or_type_hints" => {
            "Add docstrings or type hints to improve code clarity and maintainability."
        }
        "no_hardcoded_credentials_in_code" => {
            "Move hardcoded credentials from code to environment variables (e.g. .env); do not commit secrets."
        }
        "folders_lowercase_or_snake" => {
            "Use lowercase snake_case for folder names (e.g. data, src, config)."
        }
        "python_files_snake_case" => {
            "Rename Python files to snake_case to follow Python naming standards (e.g. process_data.py not ProcessData.py)."
        }
        "data_paths_use_layer_names" => {
            "Use medallion layer names in data paths (e.g. data/raw, data/bronze, data/silver, data/gold)."
        }
        "has_common_folders" => "Adopt common project folders (e.g. src, data, config, tests).",
        "no_pii_in_source_files" => {
            "Remove emails or other PII from source files; use config or environment variables for sensitive data."
        }
        "no_pii_in_medallion_data_files" => {
            "Remove emails or other PII from JSON/CSV/Parquet in data/ (raw, bronze, silver, gold), or add those files to .gitignore so they are not committed."
        }
        _ => return None,
    };
    Some(text)
}
