//! serviceapi-rra - RRA import command line
//!
//! Imports RRA batches (JSON arrays of RRA documents) into the serviceapi
//! database, checks batches without storing them, and shows the latest
//! stored assessment for a service.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serviceapi_common::config::{load_config, resolve_root_folder, TomlConfig};
use serviceapi_common::db::init_database;
use serviceapi_rra::db::latest_rra;
use serviceapi_rra::import::validate_raw;
use serviceapi_rra::{parse_batch, ImportOptions, RraImporter};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

/// Command-line arguments for serviceapi-rra
#[derive(Parser, Debug)]
#[command(name = "serviceapi-rra")]
#[command(about = "Import Risk Rating Assessments into the serviceapi database")]
#[command(version)]
struct Args {
    /// Config file (defaults to the platform config location)
    #[arg(short, long, env = "SERVICEAPI_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder containing the database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Database file, overriding root folder resolution
    #[arg(short, long, env = "SERVICEAPI_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import one or more batch files, each as its own batch
    Import {
        files: Vec<PathBuf>,

        /// Abort on the first document that fails validation
        #[arg(long)]
        stop_on_invalid: bool,
    },
    /// Validate batch files without touching the database
    Check { files: Vec<PathBuf> },
    /// Print the latest stored assessment for a service as JSON
    Show { service: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    serviceapi_common::logging::init(&config.log_level);

    info!("Starting serviceapi-rra v{}", env!("CARGO_PKG_VERSION"));

    match &args.command {
        Command::Import {
            files,
            stop_on_invalid,
        } => {
            let pool = open_database(&args, &config).await?;
            let mut options = ImportOptions::from(&config.import);
            options.stop_on_invalid |= *stop_on_invalid;
            let importer = RraImporter::new(pool.clone(), options);

            for file in files {
                let input = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let report = importer
                    .import_str(&input)
                    .await
                    .with_context(|| format!("Import of {} failed", file.display()))?;

                for rejection in &report.rejected {
                    warn!(
                        file = %file.display(),
                        index = rejection.index,
                        "document not imported: {}",
                        rejection.error
                    );
                }
                info!(
                    file = %file.display(),
                    inserted = report.inserted,
                    updated = report.updated,
                    rejected = report.rejected.len(),
                    "Imported {} of {} documents",
                    report.stored(),
                    report.stored() + report.rejected.len()
                );
            }

            pool.close().await;
        }
        Command::Check { files } => check(files)?,
        Command::Show { service } => {
            let pool = open_database(&args, &config).await?;
            let record = latest_rra(&pool, service).await?;
            pool.close().await;

            match record {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => bail!("No RRA stored for service {:?}", service),
            }
        }
    }

    Ok(())
}

/// Resolve the database location and open it
async fn open_database(args: &Args, config: &TomlConfig) -> Result<SqlitePool> {
    let db_path = match &args.database {
        Some(path) => path.clone(),
        None => {
            let root = resolve_root_folder(args.root_folder.as_deref(), config);
            config.database_path(&root)
        }
    };
    info!("Database: {}", db_path.display());

    init_database(&db_path, config.busy_timeout_ms)
        .await
        .context("Failed to open database")
}

/// Parse and validate every document, reporting problems
fn check(files: &[PathBuf]) -> Result<()> {
    let mut failures = 0;

    for file in files {
        let input = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let batch = parse_batch(&input)
            .with_context(|| format!("{} is not a batch", file.display()))?;

        for (index, raw) in batch.iter().enumerate() {
            match validate_raw(raw) {
                Ok(validated) => {
                    for warning in &validated.warnings {
                        warn!(service = %validated.rra.service, index, "{}", warning);
                    }
                }
                Err(e) => {
                    failures += 1;
                    error!(file = %file.display(), index, "{}", e);
                }
            }
        }
    }

    if failures > 0 {
        bail!("{} invalid documents", failures);
    }
    info!("All documents valid");
    Ok(())
}
