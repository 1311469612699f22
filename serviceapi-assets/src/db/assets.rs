//! Asset lookups
//!
//! Every lookup reads inside one transaction so that an asset, its owner and
//! its indicators come from the same snapshot.

use chrono::{DateTime, Utc};
use serviceapi_common::db::{Asset, Indicator, Owner, ASSET_TYPE_HOSTNAME};
use serviceapi_common::{Error, Result};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

const SELECT_ASSET: &str = r#"
    SELECT a.assetid, a.assettype, a.name, a.zone, a.description,
           a.assetgroupid, a.lastindicator, o.operator, o.team
    FROM asset a
    LEFT JOIN assetowners o ON o.ownerid = a.ownerid
"#;

#[derive(sqlx::FromRow)]
struct AssetRow {
    assetid: i64,
    assettype: String,
    name: String,
    zone: String,
    description: String,
    assetgroupid: Option<i64>,
    lastindicator: Option<DateTime<Utc>>,
    operator: Option<String>,
    team: Option<String>,
}

impl AssetRow {
    fn into_asset(self, indicators: Vec<Indicator>) -> Asset {
        let owner = match (self.operator, self.team) {
            (Some(operator), Some(team)) => Some(Owner::new(operator, team)),
            _ => None,
        };
        Asset {
            id: self.assetid,
            asset_type: self.assettype,
            name: self.name,
            zone: self.zone,
            description: self.description,
            asset_group_id: self.assetgroupid,
            owner,
            last_indicator: self.lastindicator,
            indicators,
        }
    }
}

#[derive(sqlx::FromRow)]
struct IndicatorRow {
    indicatorid: i64,
    assetid: i64,
    timestamp_utc: DateTime<Utc>,
    event_source_name: String,
    likelihood_indicator: String,
    details: Json<serde_json::Value>,
}

impl From<IndicatorRow> for Indicator {
    fn from(row: IndicatorRow) -> Self {
        Indicator {
            id: row.indicatorid,
            asset_id: row.assetid,
            timestamp: row.timestamp_utc,
            event_source: row.event_source_name,
            likelihood: row.likelihood_indicator,
            details: row.details.0,
        }
    }
}

/// Indicators of one asset, oldest first, optionally limited to one source
async fn load_indicators(
    conn: &mut SqliteConnection,
    asset_id: i64,
    event_source: Option<&str>,
) -> Result<Vec<Indicator>> {
    let rows = sqlx::query_as::<_, IndicatorRow>(
        r#"
        SELECT indicatorid, assetid, timestamp_utc, event_source_name,
               likelihood_indicator, details
        FROM indicator
        WHERE assetid = ? AND (? IS NULL OR event_source_name = ?)
        ORDER BY indicatorid
        "#,
    )
    .bind(asset_id)
    .bind(event_source)
    .bind(event_source)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Indicator::from).collect())
}

/// Attach indicators to each row
async fn assemble(
    conn: &mut SqliteConnection,
    rows: Vec<AssetRow>,
    event_source: Option<&str>,
) -> Result<Vec<Asset>> {
    let mut assets = Vec::with_capacity(rows.len());
    for row in rows {
        let indicators = load_indicators(conn, row.assetid, event_source).await?;
        assets.push(row.into_asset(indicators));
    }
    Ok(assets)
}

/// Asset by id with its owner and every indicator
pub async fn get_asset(pool: &SqlitePool, asset_id: i64) -> Result<Asset> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, AssetRow>(&format!("{} WHERE a.assetid = ?", SELECT_ASSET))
        .bind(asset_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("asset {}", asset_id)))?;

    let indicators = load_indicators(&mut tx, asset_id, None).await?;
    tx.commit().await?;

    Ok(row.into_asset(indicators))
}

/// Hostname assets with exactly this name
///
/// An unknown hostname yields an empty list.
pub async fn get_asset_hostname(pool: &SqlitePool, hostname: &str) -> Result<Vec<Asset>> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query_as::<_, AssetRow>(&format!(
        "{} WHERE a.assettype = ? AND a.name = ? ORDER BY a.assetid",
        SELECT_ASSET
    ))
    .bind(ASSET_TYPE_HOSTNAME)
    .bind(hostname)
    .fetch_all(&mut *tx)
    .await?;

    let assets = assemble(&mut tx, rows, None).await?;
    tx.commit().await?;

    debug!(hostname, count = assets.len(), "hostname lookup");
    Ok(assets)
}

/// Assets that have at least one indicator from `event_source`
///
/// Each asset carries only its indicators from that source. An unknown
/// source yields an empty list.
pub async fn indicators_from_event_source(
    pool: &SqlitePool,
    event_source: &str,
) -> Result<Vec<Asset>> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query_as::<_, AssetRow>(&format!(
        r#"{} WHERE a.assetid IN (
            SELECT assetid FROM indicator WHERE event_source_name = ?
        )
        ORDER BY a.assetid"#,
        SELECT_ASSET
    ))
    .bind(event_source)
    .fetch_all(&mut *tx)
    .await?;

    let assets = assemble(&mut tx, rows, Some(event_source)).await?;
    tx.commit().await?;

    debug!(event_source, count = assets.len(), "event source lookup");
    Ok(assets)
}
