//! Owners and asset groups

use serviceapi_common::{Error, Result};
use sqlx::SqlitePool;

/// Id of the owner for `(operator, team)`, created if missing
pub async fn ensure_owner(pool: &SqlitePool, operator: &str, team: &str) -> Result<i64> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO assetowners (operator, team) VALUES (?, ?) ON CONFLICT (operator, team) DO NOTHING",
    )
    .bind(operator)
    .bind(team)
    .execute(&mut *tx)
    .await?;

    let owner_id: i64 =
        sqlx::query_scalar("SELECT ownerid FROM assetowners WHERE operator = ? AND team = ?")
            .bind(operator)
            .bind(team)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;
    Ok(owner_id)
}

/// Id of the asset group named `name`, created if missing
pub async fn ensure_asset_group(pool: &SqlitePool, name: &str) -> Result<i64> {
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO assetgroup (name) VALUES (?) ON CONFLICT (name) DO NOTHING")
        .bind(name)
        .execute(&mut *tx)
        .await?;

    let group_id: i64 = sqlx::query_scalar("SELECT assetgroupid FROM assetgroup WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(group_id)
}

/// Set or clear the owner of an asset
pub async fn set_asset_owner(
    pool: &SqlitePool,
    asset_id: i64,
    owner_id: Option<i64>,
) -> Result<()> {
    let updated = sqlx::query("UPDATE asset SET ownerid = ? WHERE assetid = ?")
        .bind(owner_id)
        .bind(asset_id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(Error::NotFound(format!("asset {}", asset_id)));
    }
    Ok(())
}

/// Set or clear the group of an asset
pub async fn set_asset_group(
    pool: &SqlitePool,
    asset_id: i64,
    group_id: Option<i64>,
) -> Result<()> {
    let updated = sqlx::query("UPDATE asset SET assetgroupid = ? WHERE assetid = ?")
        .bind(group_id)
        .bind(asset_id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(Error::NotFound(format!("asset {}", asset_id)));
    }
    Ok(())
}
