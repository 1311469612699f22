//! RRA validation and sanitization
//!
//! Validation produces a sanitized copy of the document instead of
//! rewriting it. Fields are checked in a fixed order and the first failure
//! is returned: service name, data classification, then each risk measure
//! (see [`RiskMatrix::try_map`] for the traversal order).
//!
//! A missing probability is the one value allowed to self-heal: it becomes
//! `unknown` and a [`ValidationWarning`] is recorded.

use crate::document::{LeafPath, Measure, RawMeasure, RiskMatrix, RraDocument};
use crate::error::{ImportError, ImportResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serviceapi_common::{sanitize_impact_label, ImpactLabel};
use std::fmt;
use tracing::warn;

/// RRA fields in their normalized, storable form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedRra {
    pub service: String,
    pub data_default: String,
    pub risk: RiskMatrix<Measure>,
    pub last_modified: DateTime<Utc>,
}

/// Non-fatal issue found while validating
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValidationWarning {
    /// Probability was empty and has been set to `unknown`
    DefaultedProbability { leaf: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::DefaultedProbability { leaf } => {
                write!(f, "defaulting probability to unknown for {}", leaf)
            }
        }
    }
}

/// Successful validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validated {
    pub rra: SanitizedRra,
    pub warnings: Vec<ValidationWarning>,
}

/// Validate a parsed document and return its sanitized form
pub fn validate(doc: &RraDocument) -> ImportResult<Validated> {
    let service = sanitize_service(doc.service())?;
    let data_default = sanitize_data_classification(&doc.details.data.default, &service)?;

    let mut warnings = Vec::new();
    let risk = doc.details.risk.try_map(|path, raw| {
        let (measure, warning) = sanitize_measure(&service, path, raw)?;
        warnings.extend(warning);
        Ok::<_, ImportError>(measure)
    })?;

    Ok(Validated {
        rra: SanitizedRra {
            service,
            data_default,
            risk,
            last_modified: doc.last_modified,
        },
        warnings,
    })
}

/// Replace embedded newlines and trim; an empty result is an error
pub fn sanitize_service(raw: &str) -> ImportResult<String> {
    let service = raw.replace('\n', " ").trim().to_string();
    if service.is_empty() {
        return Err(ImportError::MissingField {
            field: "service",
            service: None,
        });
    }
    Ok(service)
}

/// Lower-case the classification and rewrite pre-"confidential" values
///
/// Values other than the legacy ones are accepted as-is.
pub fn sanitize_data_classification(raw: &str, service: &str) -> ImportResult<String> {
    let classification = raw.trim().to_lowercase();
    if classification.is_empty() {
        return Err(ImportError::MissingField {
            field: "data classification",
            service: Some(service.to_string()),
        });
    }

    let migrated = match classification.as_str() {
        "internal" => "confidential internal".to_string(),
        "restricted" => "confidential restricted".to_string(),
        "secret" => "confidential secret".to_string(),
        _ => classification,
    };
    Ok(migrated)
}

fn sanitize_measure(
    service: &str,
    path: LeafPath,
    raw: &RawMeasure,
) -> ImportResult<(Measure, Option<ValidationWarning>)> {
    let invalid = |measure: &str, value: &str| ImportError::InvalidLabel {
        service: service.to_string(),
        leaf: format!("{}.{}", path, measure),
        value: value.to_string(),
    };

    let impact = sanitize_impact_label(&raw.impact).map_err(|_| invalid("impact", &raw.impact))?;

    // Without a probability some calculations are not possible, but the
    // impact alone is still worth storing
    let (probability, warning) = if raw.probability.is_empty() {
        let leaf = format!("{}.probability", path);
        warn!(service = %service, leaf = %leaf, "defaulting probability to unknown");
        (
            ImpactLabel::Unknown,
            Some(ValidationWarning::DefaultedProbability { leaf }),
        )
    } else {
        let label = sanitize_impact_label(&raw.probability)
            .map_err(|_| invalid("probability", &raw.probability))?;
        (label, None)
    };

    Ok((Measure { impact, probability }, warning))
}
