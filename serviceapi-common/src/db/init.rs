//! Database initialization
//!
//! Opens (creating if needed) the SQLite database, applies the connection
//! pragmas and creates every table. Table creation is idempotent and runs on
//! every startup, followed by the versioned migrations.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection pool and schema
pub async fn init_database(db_path: &Path, busy_timeout_ms: u64) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Foreign keys and busy timeout are per-connection, so they go on the
    // connect options rather than a one-off PRAGMA against the pool
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    info!("Database busy timeout set to {} ms", busy_timeout_ms);

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// The pool is capped at one connection: every SQLite in-memory connection
/// is a separate database.
pub async fn init_in_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Create all tables if they don't exist
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_rra_table(pool).await?;

    // Asset / indicator read model
    create_assetowners_table(pool).await?;
    create_assetgroup_table(pool).await?;
    create_asset_table(pool).await?;
    create_indicator_table(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the rra table
///
/// One row per (service, lastmodified). The risk columns are named by the
/// initials of category, attribute and measure.
async fn create_rra_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rra (
            rraid INTEGER PRIMARY KEY AUTOINCREMENT,
            service TEXT NOT NULL,
            ari TEXT NOT NULL,
            api TEXT NOT NULL,
            afi TEXT NOT NULL,
            cri TEXT NOT NULL,
            cpi TEXT NOT NULL,
            cfi TEXT NOT NULL,
            iri TEXT NOT NULL,
            ipi TEXT NOT NULL,
            ifi TEXT NOT NULL,
            arp TEXT NOT NULL,
            app TEXT NOT NULL,
            afp TEXT NOT NULL,
            crp TEXT NOT NULL,
            cpp TEXT NOT NULL,
            cfp TEXT NOT NULL,
            irp TEXT NOT NULL,
            ipp TEXT NOT NULL,
            ifp TEXT NOT NULL,
            datadefault TEXT NOT NULL,
            lastupdated TIMESTAMP NOT NULL,
            lastmodified TIMESTAMP NOT NULL,
            raw TEXT NOT NULL,
            UNIQUE (service, lastmodified)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_assetowners_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assetowners (
            ownerid INTEGER PRIMARY KEY AUTOINCREMENT,
            operator TEXT NOT NULL,
            team TEXT NOT NULL,
            UNIQUE (operator, team)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_assetgroup_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assetgroup (
            assetgroupid INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_asset_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS asset (
            assetid INTEGER PRIMARY KEY AUTOINCREMENT,
            assettype TEXT NOT NULL,
            name TEXT NOT NULL,
            zone TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            assetgroupid INTEGER REFERENCES assetgroup (assetgroupid),
            ownerid INTEGER REFERENCES assetowners (ownerid),
            lastindicator TIMESTAMP,
            UNIQUE (assettype, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indicator_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS indicator (
            indicatorid INTEGER PRIMARY KEY AUTOINCREMENT,
            assetid INTEGER NOT NULL REFERENCES asset (assetid) ON DELETE CASCADE,
            timestamp_utc TIMESTAMP NOT NULL,
            event_source_name TEXT NOT NULL,
            likelihood_indicator TEXT NOT NULL DEFAULT 'unknown',
            details TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS indicator_event_source ON indicator (event_source_name)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
