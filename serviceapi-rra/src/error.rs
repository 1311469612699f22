//! Error types for RRA import
//!
//! Validation errors (`MissingField`, `InvalidLabel`, `Malformed`) reject a
//! single document. Storage errors (`Persistence`, `Timeout`) abort the
//! whole batch.

use std::time::Duration;
use thiserror::Error;

pub type ImportResult<T> = Result<T, ImportError>;

#[derive(Debug, Error)]
pub enum ImportError {
    /// A mandatory string field is empty after sanitization
    #[error("rra {}: missing {field}", .service.as_deref().unwrap_or("<unnamed>"))]
    MissingField {
        field: &'static str,
        service: Option<String>,
    },

    /// Impact or probability label outside the recognized vocabulary
    #[error("rra {service}: invalid label {value:?} for {leaf}")]
    InvalidLabel {
        service: String,
        leaf: String,
        value: String,
    },

    /// Document does not have the expected shape
    #[error("rra document is malformed: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Storage layer failure
    #[error("persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Storage operation exceeded the caller's deadline
    #[error("storage operation exceeded deadline of {0:?}")]
    Timeout(Duration),
}

impl ImportError {
    /// True for errors that reject one document without touching storage
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ImportError::MissingField { .. }
                | ImportError::InvalidLabel { .. }
                | ImportError::Malformed(_)
        )
    }
}
