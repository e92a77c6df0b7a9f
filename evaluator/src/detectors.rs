//! Deterministic presence-based checks for repository evaluation.
//!
//! Each detector is a pure predicate over a [`Snapshot`]: it tolerates
//! missing paths, never mutates the tree, and always produces the same
//! boolean for the same on-disk state. Scores computed from these checks are
//! therefore identical for identical repository structure.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::entrypoint;
use crate::pii;
use crate::registry::CHECK_REGISTRY;
use crate::security;
use crate::snapshot::{CONTENT_READ_CAP, Snapshot, read_file_capped};

/// Complete run result: every registry check id maps to a boolean.
pub type CheckResults = BTreeMap<&'static str, bool>;

type DetectorFn = fn(&Snapshot) -> bool;

/// Detector implementations keyed by stable check id.
const DETECTORS: &[(&str, DetectorFn)] = &[
    ("has_raw_layer", has_raw_layer),
    ("has_bronze_layer", has_bronze_layer),
    ("has_silver_layer", has_silver_layer),
    ("has_gold_layer", has_gold_layer),
    ("pipeline_orchestrates_layers", pipeline_orchestrates_layers),
    ("has_sla_calculation_file", has_sla_calculation_file),
    ("gold_has_csv_reports", gold_has_csv_reports),
    ("gold_has_parquet", gold_has_parquet),
    (
        "code_references_business_hours_or_sla",
        code_references_business_hours_or_sla,
    ),
    ("gold_has_sla_related_columns", gold_has_sla_related_columns),
    ("has_main_or_run_pipeline", has_main_or_run_pipeline),
    ("has_requirements_txt", has_requirements_txt),
    ("has_config_or_env_example", has_config_or_env_example),
    ("has_clear_entrypoint", has_clear_entrypoint),
    ("has_readme", has_readme),
    ("readme_mentions_run_or_usage", readme_mentions_run_or_usage),
    ("readme_substantive", readme_substantive),
    ("has_src_or_ingestion_structure", has_src_or_ingestion_structure),
    ("has_docstrings_or_type_hints", has_docstrings_or_type_hints),
    (
        "no_hardcoded_credentials_in_code",
        no_hardcoded_credentials_in_code,
    ),
    ("folders_lowercase_or_snake", folders_lowercase_or_snake),
    ("python_files_snake_case", python_files_snake_case),
    ("data_paths_use_layer_names", data_paths_use_layer_names),
    ("has_common_folders", has_common_folders),
    ("no_pii_in_source_files", pii::no_pii_in_source_files),
    (
        "no_pii_in_medallion_data_files",
        pii::no_pii_in_data_layers,
    ),
];

/// Run all registered checks. The result is keyed by every registry check id;
/// a check without an implementation records `false`.
///
/// An empty or missing repository tree is all-false: conventions that would
/// hold vacuously (naming, PII absence) earn nothing without a pipeline to
/// apply them to.
pub fn run_checks(snap: &Snapshot) -> CheckResults {
    let empty = is_effectively_empty(snap);
    let mut results = CheckResults::new();
    for entry in CHECK_REGISTRY {
        if results.contains_key(entry.check_id) {
            continue;
        }
        let passed = if empty {
            false
        } else {
            match lookup(entry.check_id) {
                Some(detector) => detector(snap),
                None => false,
            }
        };
        debug!(check_id = entry.check_id, passed, "check result");
        results.insert(entry.check_id, passed);
    }
    results
}

/// True when the snapshot root is missing or contains no entries.
pub fn is_effectively_empty(snap: &Snapshot) -> bool {
    match std::fs::read_dir(snap.root()) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

fn lookup(check_id: &str) -> Option<DetectorFn> {
    DETECTORS
        .iter()
        .find(|(id, _)| *id == check_id)
        .map(|(_, detector)| *detector)
}

fn has_raw_layer(snap: &Snapshot) -> bool {
    snap.path("data/raw").is_dir()
}

fn has_bronze_layer(snap: &Snapshot) -> bool {
    snap.path("data/bronze").is_dir()
}

fn has_silver_layer(snap: &Snapshot) -> bool {
    snap.path("data/silver").is_dir()
}

fn has_gold_layer(snap: &Snapshot) -> bool {
    snap.path("data/gold").is_dir()
}

fn pipeline_orchestrates_layers(snap: &Snapshot) -> bool {
    let mut content = snap.read_capped("main.py", CONTENT_READ_CAP);
    content.push_str(&snap.read_capped("src/main.py", CONTENT_READ_CAP));
    content.push_str(&snap.read_capped("run_pipeline.py", CONTENT_READ_CAP));
    let content = content.to_lowercase();
    content.contains("bronze") && content.contains("silver") && content.contains("gold")
}

fn has_sla_calculation_file(snap: &Snapshot) -> bool {
    snap.path("sla_calculation.py").is_file() || snap.path("src/sla/sla_calculation.py").is_file()
}

fn gold_has_csv_reports(snap: &Snapshot) -> bool {
    !snap
        .files_with_extension(&snap.path("data/gold"), "csv")
        .is_empty()
}

fn gold_has_parquet(snap: &Snapshot) -> bool {
    !snap
        .files_with_extension(&snap.path("data/gold"), "parquet")
        .is_empty()
}

static SLA_REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)business.?hour|sla|resolution.?hour").expect("sla reference pattern")
});

fn code_references_business_hours_or_sla(snap: &Snapshot) -> bool {
    snap.python_files(snap.root())
        .iter()
        .any(|file| SLA_REFERENCE_RE.is_match(&read_file_capped(file, CONTENT_READ_CAP)))
}

static SLA_COLUMN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)sla|resolution|business.?hour|is_sla_met").expect("sla column pattern")
});

fn gold_has_sla_related_columns(snap: &Snapshot) -> bool {
    for base in ["src/gold", "gold", "src"] {
        for file in snap.python_files(&snap.path(base)) {
            if SLA_COLUMN_RE.is_match(&read_file_capped(&file, CONTENT_READ_CAP)) {
                return true;
            }
        }
    }
    false
}

fn has_main_or_run_pipeline(snap: &Snapshot) -> bool {
    snap.path("main.py").is_file()
        || snap.path("run_pipeline.py").is_file()
        || snap.path("src/main.py").is_file()
}

fn has_requirements_txt(snap: &Snapshot) -> bool {
    snap.path("requirements.txt").is_file()
}

fn has_config_or_env_example(snap: &Snapshot) -> bool {
    [
        "config.py",
        ".env.example",
        ".env.sample",
        "config.yaml",
        "src/utils/config.py",
    ]
    .into_iter()
    .any(|name| snap.path(name).is_file())
}

fn has_clear_entrypoint(snap: &Snapshot) -> bool {
    entrypoint::find_entrypoint(snap.root()).is_some()
}

fn has_readme(snap: &Snapshot) -> bool {
    snap.path("README.md").is_file()
}

static README_USAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)run|usage|quick.?start|how to|install|setup").expect("readme usage pattern")
});

fn readme_mentions_run_or_usage(snap: &Snapshot) -> bool {
    README_USAGE_RE.is_match(&snap.read_capped("README.md", CONTENT_READ_CAP))
}

fn readme_substantive(snap: &Snapshot) -> bool {
    snap.read_capped("README.md", CONTENT_READ_CAP).trim().chars().count() >= 200
}

fn has_src_or_ingestion_structure(snap: &Snapshot) -> bool {
    snap.path("src").is_dir() || snap.path("ingestion").is_dir()
}

static TYPE_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"def\s+\w+\([^)]*:\s*[\w\[\]]+").expect("type hint pattern"));

fn has_docstrings_or_type_hints(snap: &Snapshot) -> bool {
    for base in ["src", "ingestion"] {
        for file in snap.python_files(&snap.path(base)).iter().take(15) {
            if file_has_docstrings_or_hints(&read_file_capped(file, CONTENT_READ_CAP)) {
                return true;
            }
        }
    }
    snap.python_files(snap.root())
        .iter()
        .take(15)
        .any(|file| file_has_docstrings_or_hints(&read_file_capped(file, CONTENT_READ_CAP)))
}

fn file_has_docstrings_or_hints(content: &str) -> bool {
    content.contains("\"\"\"") || content.contains("'''") || TYPE_HINT_RE.is_match(content)
}

fn no_hardcoded_credentials_in_code(snap: &Snapshot) -> bool {
    !snap
        .python_files(snap.root())
        .iter()
        .any(|file| security::has_hardcoded_credentials(&read_file_capped(file, CONTENT_READ_CAP)))
}

static SNAKE_CASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("snake case pattern"));

fn folders_lowercase_or_snake(snap: &Snapshot) -> bool {
    snap.top_level_dirs().iter().all(|dir| {
        dir.file_name()
            .map(|name| name.to_string_lossy())
            .is_some_and(|name| !name.contains(' ') && SNAKE_CASE_RE.is_match(&name))
    })
}

/// Conventional Python file stems allowed even though they are not snake_case.
const PYTHON_CONVENTIONAL_STEMS: &[&str] = &["__init__", "__main__"];

fn python_files_snake_case(snap: &Snapshot) -> bool {
    let mut files = Vec::new();
    for base in ["src", "ingestion"] {
        files.extend(snap.python_files(&snap.path(base)));
    }
    files.extend(snap.python_files(snap.root()));
    files.iter().all(|file| {
        let Some(stem) = file.file_stem().map(|stem| stem.to_string_lossy()) else {
            return false;
        };
        PYTHON_CONVENTIONAL_STEMS.contains(&stem.as_ref()) || SNAKE_CASE_RE.is_match(&stem)
    })
}

fn data_paths_use_layer_names(snap: &Snapshot) -> bool {
    let data_dir = snap.path("data");
    if !data_dir.is_dir() {
        return true;
    }
    let layers = ["raw", "bronze", "silver", "gold"];
    walkdir::WalkDir::new(&data_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .any(|entry| {
            entry
                .path()
                .strip_prefix(&data_dir)
                .ok()
                .and_then(|rel| rel.components().next())
                .map(|first| {
                    let first = first.as_os_str().to_string_lossy().to_lowercase();
                    layers.contains(&first.as_str())
                })
                .unwrap_or(false)
        })
}

fn has_common_folders(snap: &Snapshot) -> bool {
    let common = ["src", "data", "config", "tests"];
    snap.top_level_dirs().iter().any(|dir| {
        dir.file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .is_some_and(|name| common.contains(&name.as_str()))
    })
}
