//! RRA persistence
//!
//! Documents are stored one row per (service, lastmodified). Re-importing a
//! document with the same key rewrites its fields in place and refreshes
//! `lastupdated`; the key itself never changes.

use crate::error::ImportResult;
use crate::flatten::FlatRisk;
use chrono::{DateTime, Utc};
use serviceapi_common::db::RraRecord;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Connection, Sqlite, SqliteConnection, SqlitePool};

/// One validated, flattened document ready for storage
#[derive(Debug, Clone, Copy)]
pub struct RraRow<'a> {
    pub service: &'a str,
    pub risk: &'a FlatRisk,
    pub data_default: &'a str,
    pub last_modified: DateTime<Utc>,
    pub raw: &'a str,
}

/// Result of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Insert or update the row for `(service, last_modified)`
///
/// Both steps run in one transaction and the key is protected by a UNIQUE
/// constraint, so concurrent imports of the same key cannot create a second
/// row. The insert step writes every field; the update step only runs when
/// a row already existed.
pub async fn upsert_rra(
    conn: &mut SqliteConnection,
    row: &RraRow<'_>,
) -> ImportResult<UpsertOutcome> {
    let now = Utc::now();
    let mut tx = conn.begin().await?;

    let insert = sqlx::query(
        r#"
        INSERT INTO rra (
            service,
            ari, arp, api, app, afi, afp,
            cri, crp, cpi, cpp, cfi, cfp,
            iri, irp, ipi, ipp, ifi, ifp,
            datadefault, lastupdated, lastmodified, raw
        ) VALUES (
            ?,
            ?, ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?, ?,
            ?, ?, ?, ?, ?, ?,
            ?, ?, ?, ?
        )
        ON CONFLICT (service, lastmodified) DO NOTHING
        "#,
    )
    .bind(row.service);
    let inserted = bind_risk(insert, row.risk)
        .bind(row.data_default)
        .bind(now)
        .bind(row.last_modified)
        .bind(row.raw)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let outcome = if inserted == 1 {
        UpsertOutcome::Inserted
    } else {
        let update = sqlx::query(
            r#"
            UPDATE rra SET
                ari = ?, arp = ?, api = ?, app = ?, afi = ?, afp = ?,
                cri = ?, crp = ?, cpi = ?, cpp = ?, cfi = ?, cfp = ?,
                iri = ?, irp = ?, ipi = ?, ipp = ?, ifi = ?, ifp = ?,
                datadefault = ?,
                lastupdated = ?,
                raw = ?
            WHERE service = ? AND lastmodified = ?
            "#,
        );
        bind_risk(update, row.risk)
            .bind(row.data_default)
            .bind(now)
            .bind(row.raw)
            .bind(row.service)
            .bind(row.last_modified)
            .execute(&mut *tx)
            .await?;
        UpsertOutcome::Updated
    };

    tx.commit().await?;

    Ok(outcome)
}

/// Bind the 18 risk values in column order
fn bind_risk<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    risk: &FlatRisk,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    risk.values()
        .iter()
        .fold(query, |query, value| query.bind(value.as_str()))
}

const SELECT_RRA: &str = r#"
    SELECT service,
           ari, arp, api, app, afi, afp,
           cri, crp, cpi, cpp, cfi, cfp,
           iri, irp, ipi, ipp, ifi, ifp,
           datadefault, lastupdated, lastmodified, raw
    FROM rra
"#;

/// Load the row stored for one key
pub async fn load_rra(
    pool: &SqlitePool,
    service: &str,
    last_modified: DateTime<Utc>,
) -> ImportResult<Option<RraRecord>> {
    let record = sqlx::query_as::<_, RraRecord>(&format!(
        "{} WHERE service = ? AND lastmodified = ?",
        SELECT_RRA
    ))
    .bind(service)
    .bind(last_modified)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Most recent assessment for a service
pub async fn latest_rra(pool: &SqlitePool, service: &str) -> ImportResult<Option<RraRecord>> {
    let record = sqlx::query_as::<_, RraRecord>(&format!(
        "{} WHERE service = ? ORDER BY lastmodified DESC LIMIT 1",
        SELECT_RRA
    ))
    .bind(service)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Number of stored rows for a service
pub async fn count_rras(pool: &SqlitePool, service: &str) -> ImportResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM rra WHERE service = ?")
        .bind(service)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Measure, RiskMatrix};
    use crate::flatten::flatten;
    use chrono::TimeZone;
    use serviceapi_common::db::init_in_memory_database;
    use serviceapi_common::ImpactLabel;

    fn risk(impact: ImpactLabel) -> FlatRisk {
        let matrix = RiskMatrix::<()>::default()
            .try_map(|_, _| {
                Ok::<_, ()>(Measure {
                    impact,
                    probability: ImpactLabel::Low,
                })
            })
            .unwrap();
        flatten(&matrix)
    }

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 3, day, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_update_same_key() {
        let pool = init_in_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let high = risk(ImpactLabel::High);
        let row = RraRow {
            service: "svc",
            risk: &high,
            data_default: "public",
            last_modified: ts(1),
            raw: r#"{"v":1}"#,
        };
        assert_eq!(upsert_rra(&mut conn, &row).await.unwrap(), UpsertOutcome::Inserted);

        let low = risk(ImpactLabel::Low);
        let row = RraRow {
            risk: &low,
            data_default: "confidential internal",
            raw: r#"{"v":2}"#,
            ..row
        };
        assert_eq!(upsert_rra(&mut conn, &row).await.unwrap(), UpsertOutcome::Updated);
        drop(conn);

        assert_eq!(count_rras(&pool, "svc").await.unwrap(), 1);
        let stored = load_rra(&pool, "svc", ts(1)).await.unwrap().unwrap();
        assert_eq!(stored.ari, "low");
        assert_eq!(stored.datadefault, "confidential internal");
        assert_eq!(stored.raw, r#"{"v":2}"#);
        assert_eq!(stored.lastmodified, ts(1));
    }

    #[rustfmt::skip]
    #[tokio::test]
    async fn test_columns_follow_flat_order() {
        let pool = init_in_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let flat = risk(ImpactLabel::Maximum);
        let row = RraRow {
            service: "svc",
            risk: &flat,
            data_default: "public",
            last_modified: ts(2),
            raw: "{}",
        };
        upsert_rra(&mut conn, &row).await.unwrap();
        drop(conn);

        let stored = load_rra(&pool, "svc", ts(2)).await.unwrap().unwrap();
        let by_column = [
            &stored.ari, &stored.arp, &stored.api, &stored.app, &stored.afi, &stored.afp,
            &stored.cri, &stored.crp, &stored.cpi, &stored.cpp, &stored.cfi, &stored.cfp,
            &stored.iri, &stored.irp, &stored.ipi, &stored.ipp, &stored.ifi, &stored.ifp,
        ];
        for ((column, value), stored) in flat.iter().zip(by_column) {
            assert_eq!(stored, value.as_str(), "column {}", column);
        }
    }

    #[tokio::test]
    async fn test_latest_rra_picks_newest_lastmodified() {
        let pool = init_in_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let flat = risk(ImpactLabel::Medium);

        for day in [3, 9, 5] {
            let row = RraRow {
                service: "svc",
                risk: &flat,
                data_default: "public",
                last_modified: ts(day),
                raw: "{}",
            };
            upsert_rra(&mut conn, &row).await.unwrap();
        }
        drop(conn);

        let latest = latest_rra(&pool, "svc").await.unwrap().unwrap();
        assert_eq!(latest.lastmodified, ts(9));
        assert!(latest_rra(&pool, "other").await.unwrap().is_none());
    }
}
