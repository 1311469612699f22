//! Batch import
//!
//! A batch is a JSON array of RRA documents. Documents are processed one at
//! a time over a single pooled connection, which is returned to the pool on
//! every exit path. Each document is validated, flattened and upserted.
//!
//! A document that fails to parse or validate is rejected and the batch
//! continues, unless [`ImportOptions::stop_on_invalid`] is set. A storage
//! failure stops the batch immediately and is returned as-is; the batch can
//! be retried as a whole because each upsert is idempotent.

use crate::db::{upsert_rra, RraRow, UpsertOutcome};
use crate::document::RraDocument;
use crate::error::{ImportError, ImportResult};
use crate::flatten::flatten;
use crate::validate::{validate, Validated, ValidationWarning};
use serde_json::value::RawValue;
use serviceapi_common::config::ImportConfig;
use sqlx::{SqliteConnection, SqlitePool};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Split a batch into its documents, each kept verbatim
pub fn parse_batch(input: &str) -> ImportResult<Vec<Box<RawValue>>> {
    serde_json::from_str(input).map_err(ImportError::Malformed)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Return the first validation error instead of skipping the document
    pub stop_on_invalid: bool,
    /// Deadline for each storage operation
    pub statement_timeout: Option<Duration>,
}

impl From<&ImportConfig> for ImportOptions {
    fn from(config: &ImportConfig) -> Self {
        Self {
            stop_on_invalid: config.stop_on_invalid,
            statement_timeout: config.statement_timeout(),
        }
    }
}

/// Document that was not imported
#[derive(Debug)]
pub struct Rejection {
    /// Position in the batch
    pub index: usize,
    pub service: Option<String>,
    pub error: ImportError,
}

/// Warning raised while validating an imported document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentWarning {
    pub index: usize,
    pub service: String,
    pub warning: ValidationWarning,
}

/// Summary of one batch
#[derive(Debug, Default)]
pub struct ImportReport {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: Vec<Rejection>,
    pub warnings: Vec<DocumentWarning>,
}

impl ImportReport {
    /// Documents written to storage
    pub fn stored(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Imports RRA batches into the `rra` table
#[derive(Clone)]
pub struct RraImporter {
    pool: SqlitePool,
    options: ImportOptions,
}

impl RraImporter {
    pub fn new(pool: SqlitePool, options: ImportOptions) -> Self {
        Self { pool, options }
    }

    /// Parse and import a JSON array of documents
    pub async fn import_str(&self, input: &str) -> ImportResult<ImportReport> {
        let batch = parse_batch(input)?;
        self.import(&batch).await
    }

    /// Import documents in order
    pub async fn import(&self, batch: &[Box<RawValue>]) -> ImportResult<ImportReport> {
        let mut conn = self.pool.acquire().await?;
        let mut report = ImportReport::default();

        for (index, raw) in batch.iter().enumerate() {
            let validated = match validate_raw(raw) {
                Ok(validated) => validated,
                Err(error) => {
                    let service = service_hint(raw);
                    warn!(index, service = ?service, "rejecting rra: {}", error);
                    if self.options.stop_on_invalid {
                        return Err(error);
                    }
                    report.rejected.push(Rejection {
                        index,
                        service,
                        error,
                    });
                    continue;
                }
            };

            let rra = &validated.rra;
            let risk = flatten(&rra.risk);
            let row = RraRow {
                service: &rra.service,
                risk: &risk,
                data_default: &rra.data_default,
                last_modified: rra.last_modified,
                raw: raw.get(),
            };

            match self.store(&mut conn, &row).await {
                Ok(UpsertOutcome::Inserted) => report.inserted += 1,
                Ok(UpsertOutcome::Updated) => report.updated += 1,
                Err(error) => {
                    warn!(
                        service = %rra.service,
                        lastmodified = %rra.last_modified,
                        "rra import aborted: {}",
                        error
                    );
                    return Err(error);
                }
            }
            debug!(service = %rra.service, lastmodified = %rra.last_modified, "stored rra");

            report
                .warnings
                .extend(validated.warnings.into_iter().map(|warning| DocumentWarning {
                    index,
                    service: rra.service.clone(),
                    warning,
                }));
        }

        info!(
            inserted = report.inserted,
            updated = report.updated,
            rejected = report.rejected.len(),
            warnings = report.warnings.len(),
            "rra batch imported"
        );

        Ok(report)
    }

    async fn store(
        &self,
        conn: &mut SqliteConnection,
        row: &RraRow<'_>,
    ) -> ImportResult<UpsertOutcome> {
        match self.options.statement_timeout {
            Some(limit) => tokio::time::timeout(limit, upsert_rra(conn, row))
                .await
                .map_err(|_| ImportError::Timeout(limit))?,
            None => upsert_rra(conn, row).await,
        }
    }
}

/// Parse and validate one document of a batch
pub fn validate_raw(raw: &RawValue) -> ImportResult<Validated> {
    let document: RraDocument = serde_json::from_str(raw.get()).map_err(ImportError::Malformed)?;
    validate(&document)
}

/// Best-effort service name for reporting a rejected document
fn service_hint(raw: &RawValue) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw.get()).ok()?;
    let service = value.pointer("/details/metadata/service")?.as_str()?;
    let service = service.replace('\n', " ").trim().to_string();
    (!service.is_empty()).then_some(service)
}
