//! Database schema migrations
//!
//! Versioned, idempotent upgrades for databases created by older releases.
//! The applied version is tracked in the `schema_version` table.
//!
//! Never modify an existing migration; add a new one and bump
//! [`CURRENT_SCHEMA_VERSION`].

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Get current schema version from database
///
/// Returns 0 if schema_version has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> = sqlx::query_scalar(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1"
    )
    .fetch_optional(pool)
    .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    Ok(())
}

/// Migration v1: enforce one rra row per (service, lastmodified)
///
/// Databases written before the key was constrained may hold several rows
/// for the same key. The most recently updated one survives.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: unique (service, lastmodified) on rra");

    let mut tx = pool.begin().await?;

    let removed = sqlx::query(
        r#"
        DELETE FROM rra
        WHERE rraid NOT IN (
            SELECT rraid FROM (
                SELECT rraid,
                       ROW_NUMBER() OVER (
                           PARTITION BY service, lastmodified
                           ORDER BY lastupdated DESC, rraid DESC
                       ) AS rn
                FROM rra
            )
            WHERE rn = 1
        )
        "#,
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if removed > 0 {
        warn!("  Removed {} duplicate rra rows", removed);
    }

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS rra_service_lastmodified ON rra (service, lastmodified)",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(())
}
