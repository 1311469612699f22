//! Read model lookups against a seeded store
//!
//! Tests cover:
//! - Hostname lookup with owner, group and indicators
//! - Event source lookup filtering indicators per asset
//! - Unknown hostnames and sources yielding empty results
//! - JSON shape of a returned asset

use serde_json::json;
use serviceapi_assets::{
    ensure_asset_group, ensure_owner, get_asset, get_asset_hostname, indicators_from_event_source,
    record_indicator, set_asset_group, set_asset_owner, NewIndicator,
};
use serviceapi_common::db::init_in_memory_database;
use sqlx::SqlitePool;

fn indicator(hostname: &str, event_source: &str) -> NewIndicator {
    serde_json::from_value(json!({
        "asset_type": "hostname",
        "asset_identifier": hostname,
        "zone": "testzone",
        "description": "test asset",
        "event_source_name": event_source,
        "likelihood_indicator": "medium",
        "details": { "noop": "no details in test indicator" }
    }))
    .unwrap()
}

/// Five hosts with a "testing" indicator; the first also has one from
/// "secondeventsource". Every host belongs to group 1 and operator/testservice.
async fn seeded_store() -> SqlitePool {
    let pool = init_in_memory_database().await.unwrap();

    let group_id = ensure_asset_group(&pool, "testservice").await.unwrap();
    let owner_id = ensure_owner(&pool, "operator", "testservice").await.unwrap();

    for n in 1..=5 {
        let hostname = format!("testhost{}.mozilla.com", n);
        let asset_id = record_indicator(&pool, &indicator(&hostname, "testing"))
            .await
            .unwrap();
        set_asset_group(&pool, asset_id, Some(group_id)).await.unwrap();
        set_asset_owner(&pool, asset_id, Some(owner_id)).await.unwrap();
    }
    record_indicator(&pool, &indicator("testhost1.mozilla.com", "secondeventsource"))
        .await
        .unwrap();

    pool
}

#[tokio::test]
async fn test_get_asset_hostname() {
    let pool = seeded_store().await;

    let assets = get_asset_hostname(&pool, "testhost1.mozilla.com").await.unwrap();
    assert_eq!(assets.len(), 1);

    let asset = &assets[0];
    assert_eq!(asset.asset_group_id, Some(1));
    let owner = asset.owner.as_ref().unwrap();
    assert_eq!(owner.operator(), "operator");
    assert_eq!(owner.team(), "testservice");
    assert_eq!(owner.triage_key(), "operator-testservice");
    assert_eq!(asset.indicators.len(), 2);
    for indicator in &asset.indicators {
        assert_eq!(indicator.asset_id, asset.id);
        assert_eq!(
            serde_json::to_string(&indicator.details).unwrap(),
            r#"{"noop":"no details in test indicator"}"#
        );
    }
}

#[tokio::test]
async fn test_get_asset_hostname_unknown_is_empty() {
    let pool = seeded_store().await;
    assert!(get_asset_hostname(&pool, "nohost.mozilla.com").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_indicators_from_event_source() {
    let pool = seeded_store().await;

    let assets = indicators_from_event_source(&pool, "testing").await.unwrap();
    assert_eq!(assets.len(), 5);
    for asset in &assets {
        assert_eq!(asset.indicators.len(), 1);
        assert_eq!(asset.indicators[0].event_source, "testing");
    }

    let assets = indicators_from_event_source(&pool, "secondeventsource").await.unwrap();
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].name, "testhost1.mozilla.com");
    assert_eq!(assets[0].indicators.len(), 1);
    assert_eq!(assets[0].indicators[0].event_source, "secondeventsource");

    let assets = indicators_from_event_source(&pool, "nonexistent").await.unwrap();
    assert!(assets.is_empty());
}

#[tokio::test]
async fn test_get_asset_json_shape() {
    let pool = seeded_store().await;
    let id = get_asset_hostname(&pool, "testhost2.mozilla.com").await.unwrap()[0].id;

    let asset = get_asset(&pool, id).await.unwrap();
    let value = serde_json::to_value(&asset).unwrap();

    assert_eq!(value["type"], "hostname");
    assert_eq!(value["name"], "testhost2.mozilla.com");
    assert_eq!(value["zone"], "testzone");
    assert_eq!(value["assetGroupID"], 1);
    assert_eq!(value["owner"]["triageKey"], "operator-testservice");
    assert_eq!(value["indicators"][0]["eventSource"], "testing");
    assert_eq!(value["indicators"][0]["likelihood"], "medium");
    assert_eq!(value["indicators"][0]["assetID"], id);
}
