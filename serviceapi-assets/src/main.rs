//! serviceapi-assets - Asset read model command line
//!
//! Looks up assets by id, hostname or indicator event source and prints them
//! as JSON. Indicators can be recorded from a JSON file and assets deleted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serviceapi_assets::db::connect_readonly;
use serviceapi_assets::{
    delete_asset, get_asset, get_asset_hostname, indicators_from_event_source, parse_indicators,
    record_indicator,
};
use serviceapi_common::config::{load_config, resolve_root_folder, TomlConfig};
use serviceapi_common::db::init_database;
use sqlx::SqlitePool;
use tracing::info;

/// Command-line arguments for serviceapi-assets
#[derive(Parser, Debug)]
#[command(name = "serviceapi-assets")]
#[command(about = "Query assets and indicators in the serviceapi database")]
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
    /// Show one asset by id
    Id { id: i64 },
    /// List hostname assets with this name
    Hostname { hostname: String },
    /// List assets with indicators from an event source
    Source { event_source: String },
    /// Record indicators from a JSON file (an object or an array of objects)
    Record { file: PathBuf },
    /// Delete an asset and its indicators
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    serviceapi_common::logging::init(&config.log_level);

    info!("Starting serviceapi-assets v{}", env!("CARGO_PKG_VERSION"));

    let db_path = database_path(&args, &config);
    info!("Database: {}", db_path.display());

    match &args.command {
        Command::Id { id } => {
            let pool = connect_readonly(&db_path, config.busy_timeout_ms).await?;
            print_json(&get_asset(&pool, *id).await?)?;
            pool.close().await;
        }
        Command::Hostname { hostname } => {
            let pool = connect_readonly(&db_path, config.busy_timeout_ms).await?;
            print_json(&get_asset_hostname(&pool, hostname).await?)?;
            pool.close().await;
        }
        Command::Source { event_source } => {
            let pool = connect_readonly(&db_path, config.busy_timeout_ms).await?;
            print_json(&indicators_from_event_source(&pool, event_source).await?)?;
            pool.close().await;
        }
        Command::Record { file } => {
            let input = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let indicators = parse_indicators(&input)
                .with_context(|| format!("{} does not hold indicators", file.display()))?;

            let pool = open_writable(&db_path, &config).await?;
            for indicator in &indicators {
                let asset_id = record_indicator(&pool, indicator).await.with_context(|| {
                    format!("Failed to record indicator for {}", indicator.asset_identifier)
                })?;
                println!("{}", asset_id);
            }
            pool.close().await;
        }
        Command::Delete { id } => {
            let pool = open_writable(&db_path, &config).await?;
            delete_asset(&pool, *id).await?;
            pool.close().await;
        }
    }

    Ok(())
}

fn database_path(args: &Args, config: &TomlConfig) -> PathBuf {
    match &args.database {
        Some(path) => path.clone(),
        None => {
            let root = resolve_root_folder(args.root_folder.as_deref(), config);
            config.database_path(&root)
        }
    }
}

async fn open_writable(db_path: &std::path::Path, config: &TomlConfig) -> Result<SqlitePool> {
    init_database(db_path, config.busy_timeout_ms)
        .await
        .context("Failed to open database")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
