//! Database access for the asset read model

use serviceapi_common::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub mod assets;
pub mod indicators;
pub mod owners;

/// Open an existing database without write access
///
/// Lookups never write, so the read-only CLI commands use this instead of
/// `init_database`, which would create the file and run migrations.
pub async fn connect_readonly(db_path: &Path, busy_timeout_ms: u64) -> Result<SqlitePool> {
    if !db_path.exists() {
        return Err(Error::NotFound(format!(
            "database {} (import data first to create it)",
            db_path.display()
        )));
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .read_only(true)
        .busy_timeout(Duration::from_millis(busy_timeout_ms));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    Ok(pool)
}
