//! Recording indicators
//!
//! An indicator names its asset by type and identifier. The asset is created
//! on first sight and reused afterwards.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serviceapi_common::{sanitize_impact_label, Error, Result};
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::info;

/// Indicator as reported by an event source
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewIndicator {
    pub asset_type: String,
    pub asset_identifier: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "event_source_name")]
    pub event_source: String,
    #[serde(rename = "likelihood_indicator")]
    pub likelihood: String,
    /// Defaults to the time of recording
    #[serde(default)]
    pub timestamp_utc: Option<DateTime<Utc>>,
    #[serde(default = "empty_details")]
    pub details: serde_json::Value,
}

fn empty_details() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

/// Parse one indicator object or an array of them
///
/// Errors name the offending element and carry serde's field message.
pub fn parse_indicators(input: &str) -> Result<Vec<NewIndicator>> {
    let value: serde_json::Value = serde_json::from_str(input)
        .map_err(|e| Error::InvalidInput(format!("not JSON: {}", e)))?;

    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value(item)
                    .map_err(|e| Error::InvalidInput(format!("indicator {}: {}", index, e)))
            })
            .collect(),
        serde_json::Value::Object(_) => {
            let indicator = serde_json::from_value(value)
                .map_err(|e| Error::InvalidInput(format!("indicator: {}", e)))?;
            Ok(vec![indicator])
        }
        _ => Err(Error::InvalidInput(
            "expected an indicator object or an array of them".to_string(),
        )),
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(value)
}

/// Store an indicator, creating its asset if needed
///
/// Returns the id of the asset the indicator was attached to. Zone and
/// description are only used when the asset is created.
pub async fn record_indicator(pool: &SqlitePool, indicator: &NewIndicator) -> Result<i64> {
    let asset_type = required(&indicator.asset_type, "asset_type")?;
    let identifier = required(&indicator.asset_identifier, "asset_identifier")?;
    let event_source = required(&indicator.event_source, "event_source_name")?;
    let likelihood = sanitize_impact_label(&indicator.likelihood)
        .map_err(|e| Error::InvalidInput(format!("likelihood_indicator: {}", e)))?;
    let timestamp = indicator.timestamp_utc.unwrap_or_else(Utc::now);

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO asset (assettype, name, zone, description)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (assettype, name) DO NOTHING
        "#,
    )
    .bind(asset_type)
    .bind(identifier)
    .bind(indicator.zone.trim())
    .bind(indicator.description.trim())
    .execute(&mut *tx)
    .await?;

    let asset_id: i64 =
        sqlx::query_scalar("SELECT assetid FROM asset WHERE assettype = ? AND name = ?")
            .bind(asset_type)
            .bind(identifier)
            .fetch_one(&mut *tx)
            .await?;

    sqlx::query(
        r#"
        INSERT INTO indicator (
            assetid, timestamp_utc, event_source_name, likelihood_indicator, details
        )
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(asset_id)
    .bind(timestamp)
    .bind(event_source)
    .bind(likelihood.as_str())
    .bind(Json(&indicator.details))
    .execute(&mut *tx)
    .await?;

    // Indicators may arrive out of order
    sqlx::query(
        r#"
        UPDATE asset SET lastindicator = ?
        WHERE assetid = ? AND (lastindicator IS NULL OR lastindicator < ?)
        "#,
    )
    .bind(timestamp)
    .bind(asset_id)
    .bind(timestamp)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(asset_id, asset_type, identifier, event_source, "recorded indicator");
    Ok(asset_id)
}

/// Delete an asset and its indicators
pub async fn delete_asset(pool: &SqlitePool, asset_id: i64) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM asset WHERE assetid = ?")
        .bind(asset_id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::NotFound(format!("asset {}", asset_id)));
    }

    info!(asset_id, "deleted asset");
    Ok(())
}
