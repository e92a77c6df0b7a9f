//! Repository evaluator for medallion-architecture data pipelines.
//!
//! Clones candidate repositories, runs their pipelines in an isolated
//! sandbox, scores them against a fixed registry of presence checks, and
//! writes one result row per repository.

mod cli;
mod clone;
mod cloud;
mod config;
mod context;
mod detectors;
mod entrypoint;
mod harness;
mod llm;
mod logging;
mod pii;
mod process;
mod registry;
mod report;
mod run;
mod scoring;
mod security;
mod sheet;
mod snapshot;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::{EvalConfig, load_config};

#[derive(Parser)]
#[command(
    name = "evaluator",
    version,
    about = "Evaluator for medallion-architecture pipeline repositories"
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "evaluator.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate every repository listed on the input sheet.
    Evaluate {
        /// Input CSV with a repo_url column.
        #[arg(long, short)]
        file: PathBuf,
        /// Output CSV path.
        #[arg(long, short, default_value = "repos_evaluated.csv")]
        output: PathBuf,
        /// Force this run command for every repository.
        #[arg(long)]
        run_command: Option<String>,
    },
    /// Score a local repository tree and print the full report.
    Inspect { path: PathBuf },
    /// Remove the clone cache.
    Clean,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = load_runtime_config(&cli)?;
    match cli.command {
        Command::Evaluate { file, output, .. } => cli::evaluate_batch(&file, &output, &cfg),
        Command::Inspect { path } => cli::inspect_tree(&path),
        Command::Clean => cli::clean(&cfg),
    }
}

fn load_runtime_config(cli: &Cli) -> Result<EvalConfig> {
    let mut cfg = load_config(&cli.config)?;
    let vars: BTreeMap<String, String> = std::env::vars().collect();
    cfg.apply_env_overrides(&vars);
    cfg.collect_forward_env(&vars);
    if let Command::Evaluate {
        run_command: Some(run_command),
        ..
    } = &cli.command
    {
        cfg.run_command = Some(run_command.clone());
    }
    cfg.validate()?;
    Ok(cfg)
}
