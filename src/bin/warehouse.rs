//! Warehouse CLI
//!
//! Runs the staging, dimension, fact and aggregate stages against raw
//! extracts.
//!
//! # Usage
//!
//! ```bash
//! # Build everything from data/raw into the in-memory store (dry run)
//! warehouse run
//!
//! # Load into Postgres (needs the `database` feature)
//! DATABASE_URL=postgresql:///congresso warehouse run
//!
//! # Rebuild two facts from scratch
//! warehouse run --select fct_ceaps,fct_votacao --full-refresh
//!
//! # Show the stage order
//! warehouse list
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use congresso_warehouse::{
    config::DEFAULT_CONFIG_PATH, raw::DirectorySource, telemetry, Pipeline, RunOptions,
    RunReport, StepOutcome, WarehouseConfig,
};
use warehouse_core::{MemoryWarehouse, Warehouse};

#[derive(Parser)]
#[command(name = "warehouse")]
#[command(version)]
#[command(about = "Build the Congress transparency warehouse from raw extracts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Materialization config
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline
    Run {
        /// Raw extract directory (overrides `raw_dir` in the config)
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Only run these stages (comma separated)
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,

        /// Rebuild incremental tables from scratch
        #[arg(long)]
        full_refresh: bool,

        /// Postgres connection string; without it the run uses an in-memory store
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stages in execution order
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    telemetry::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            raw_dir,
            select,
            full_refresh,
            database_url,
            json,
        } => {
            let options = RunOptions {
                full_refresh,
                select,
            };
            cmd_run(&cli.config, raw_dir, database_url, options, json).await
        }
        Commands::List => cmd_list(),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn cmd_run(
    config_path: &Path,
    raw_dir: Option<PathBuf>,
    database_url: Option<String>,
    options: RunOptions,
    json: bool,
) -> Result<bool> {
    let config = if config_path.exists() {
        WarehouseConfig::from_file(config_path)
            .with_context(|| format!("loading {}", config_path.display()))?
    } else {
        tracing::warn!(path = %config_path.display(), "config not found, every table is rebuilt in full");
        WarehouseConfig::default()
    };
    let raw = DirectorySource::new(raw_dir.unwrap_or_else(|| config.raw_dir.clone()));
    tracing::info!(raw_dir = %raw.root().display(), "reading raw extracts");

    let warehouse = open_warehouse(database_url.as_deref(), &config.database_schema).await?;
    let pipeline = Pipeline::standard()?;
    let report = pipeline
        .run(warehouse.as_ref(), &raw, &config, &options)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report.is_success())
}

#[cfg(feature = "database")]
async fn open_warehouse(url: Option<&str>, schema: &str) -> Result<Box<dyn Warehouse>> {
    match url {
        Some(url) => {
            let pg = warehouse_postgres::PgWarehouse::connect(url, schema).await?;
            tracing::info!(schema, "connected to postgres");
            Ok(Box::new(pg))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Ok(Box::new(MemoryWarehouse::new()))
        }
    }
}

#[cfg(not(feature = "database"))]
async fn open_warehouse(url: Option<&str>, _schema: &str) -> Result<Box<dyn Warehouse>> {
    if url.is_some() {
        tracing::warn!("built without the `database` feature, DATABASE_URL ignored");
    }
    Ok(Box::new(MemoryWarehouse::new()))
}

fn cmd_list() -> Result<bool> {
    let pipeline = Pipeline::standard()?;
    for stage in pipeline.stages() {
        let inputs = if stage.inputs.is_empty() {
            String::new()
        } else {
            format!(" <- {}", stage.inputs.join(", "))
        };
        println!(
            "{:<10} {}{}",
            stage.layer.as_str().dimmed(),
            stage.name.bold(),
            inputs
        );
    }
    Ok(true)
}

fn print_report(report: &RunReport) {
    for step in &report.steps {
        let (status, detail) = match &step.outcome {
            StepOutcome::Built { rows } => ("BUILT".green().bold(), format!("{rows} rows")),
            StepOutcome::Merged {
                inserted,
                updated,
                total,
            } => (
                "MERGED".green().bold(),
                format!("+{inserted} ~{updated} ({total} rows)"),
            ),
            StepOutcome::Skipped { reason } => ("SKIPPED".yellow().bold(), reason.clone()),
            StepOutcome::Failed { error } => ("FAILED".red().bold(), error.clone()),
        };
        println!("{:<8} {:<28} {}", status, step.stage, detail);
    }

    let failed = report.failed().count();
    let skipped = report.skipped().count();
    println!();
    if failed == 0 {
        println!(
            "{} {} stages, {} skipped",
            "OK".green().bold(),
            report.steps.len(),
            skipped
        );
    } else {
        println!(
            "{} {} of {} stages failed, {} skipped",
            "FAILED".red().bold(),
            failed,
            report.steps.len(),
            skipped
        );
    }
}
