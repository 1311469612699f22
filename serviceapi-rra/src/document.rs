//! RRA document structure
//!
//! Only the fields we normalize and store are described here; everything
//! else in the document is kept verbatim in the `raw` column.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serviceapi_common::ImpactLabel;
use std::fmt;

/// Parsed RRA document as exported by the RRA index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RraDocument {
    pub details: RraDetails,
    #[serde(rename = "lastmodified")]
    pub last_modified: DateTime<Utc>,
}

impl RraDocument {
    /// Service name as found in the document, before sanitization
    pub fn service(&self) -> &str {
        &self.details.metadata.service
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RraDetails {
    #[serde(default)]
    pub metadata: RraMetadata,
    #[serde(default)]
    pub risk: RiskMatrix<RawMeasure>,
    #[serde(default)]
    pub data: RraData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RraMetadata {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub service: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RraData {
    /// Default data classification
    #[serde(default, deserialize_with = "null_as_empty")]
    pub default: String,
}

/// Impact and probability labels exactly as they appear in the document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMeasure {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub impact: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub probability: String,
}

/// Sanitized impact and probability labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub impact: ImpactLabel,
    pub probability: ImpactLabel,
}

/// Risk categories, each rating the same three attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskMatrix<M> {
    #[serde(default)]
    pub confidentiality: RiskCategory<M>,
    #[serde(default)]
    pub integrity: RiskCategory<M>,
    #[serde(default)]
    pub availability: RiskCategory<M>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCategory<M> {
    #[serde(default)]
    pub reputation: M,
    #[serde(default)]
    pub finances: M,
    #[serde(default)]
    pub productivity: M,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Confidentiality,
    Integrity,
    Availability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Reputation,
    Finances,
    Productivity,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Confidentiality => "confidentiality",
            Category::Integrity => "integrity",
            Category::Availability => "availability",
        }
    }
}

impl Attribute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Reputation => "reputation",
            Attribute::Finances => "finances",
            Attribute::Productivity => "productivity",
        }
    }
}

/// Location of one measure in the risk matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafPath {
    pub category: Category,
    pub attribute: Attribute,
}

impl fmt::Display for LeafPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.category.as_str(), self.attribute.as_str())
    }
}

impl<M> RiskCategory<M> {
    fn try_map<N, E>(
        &self,
        category: Category,
        f: &mut impl FnMut(LeafPath, &M) -> Result<N, E>,
    ) -> Result<RiskCategory<N>, E> {
        let mut leaf = |attribute, measure| f(LeafPath { category, attribute }, measure);
        Ok(RiskCategory {
            reputation: leaf(Attribute::Reputation, &self.reputation)?,
            finances: leaf(Attribute::Finances, &self.finances)?,
            productivity: leaf(Attribute::Productivity, &self.productivity)?,
        })
    }
}

impl<M> RiskMatrix<M> {
    /// Transform every measure, stopping at the first error
    ///
    /// Visits confidentiality, integrity, then availability; within each,
    /// reputation, finances, then productivity.
    pub fn try_map<N, E>(
        &self,
        mut f: impl FnMut(LeafPath, &M) -> Result<N, E>,
    ) -> Result<RiskMatrix<N>, E> {
        Ok(RiskMatrix {
            confidentiality: self.confidentiality.try_map(Category::Confidentiality, &mut f)?,
            integrity: self.integrity.try_map(Category::Integrity, &mut f)?,
            availability: self.availability.try_map(Category::Availability, &mut f)?,
        })
    }
}

/// Treat an explicit JSON `null` like a missing string
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let doc: RraDocument = serde_json::from_str(
            r#"{
                "lastmodified": "2017-02-10T13:59:04.000Z",
                "details": {
                    "metadata": {"service": "Firefox Accounts", "owner": "ignored"},
                    "risk": {
                        "confidentiality": {"reputation": {"impact": "HIGH", "probability": "low"}}
                    },
                    "data": {"default": "Restricted"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(doc.service(), "Firefox Accounts");
        assert_eq!(doc.details.data.default, "Restricted");
        assert_eq!(doc.details.risk.confidentiality.reputation.impact, "HIGH");
        // Absent leaves parse as empty labels
        assert_eq!(doc.details.risk.availability.finances, RawMeasure::default());
        assert_eq!(doc.last_modified.to_rfc3339(), "2017-02-10T13:59:04+00:00");
    }

    #[test]
    fn test_null_strings_are_empty() {
        let doc: RraDocument = serde_json::from_str(
            r#"{"lastmodified": "2017-02-10T13:59:04Z",
                "details": {"metadata": {"service": null},
                            "risk": {"integrity": {"finances": {"impact": "low", "probability": null}}}}}"#,
        )
        .unwrap();

        assert_eq!(doc.service(), "");
        assert_eq!(doc.details.risk.integrity.finances.probability, "");
    }

    #[test]
    fn test_offset_timestamps_normalize_to_utc() {
        let a: RraDocument =
            serde_json::from_str(r#"{"lastmodified": "2017-02-10T14:59:04+01:00", "details": {}}"#)
                .unwrap();
        let b: RraDocument =
            serde_json::from_str(r#"{"lastmodified": "2017-02-10T13:59:04Z", "details": {}}"#)
                .unwrap();
        assert_eq!(a.last_modified, b.last_modified);
    }

    #[test]
    fn test_missing_lastmodified_is_rejected() {
        let parsed = serde_json::from_str::<RraDocument>(r#"{"details": {}}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_try_map_visit_order() {
        let matrix = RiskMatrix::<RawMeasure>::default();
        let mut visited = Vec::new();
        matrix
            .try_map(|path, _| {
                visited.push(path.to_string());
                Ok::<_, ()>(())
            })
            .unwrap();

        assert_eq!(
            visited,
            vec![
                "confidentiality.reputation",
                "confidentiality.finances",
                "confidentiality.productivity",
                "integrity.reputation",
                "integrity.finances",
                "integrity.productivity",
                "availability.reputation",
                "availability.finances",
                "availability.productivity",
            ]
        );
    }

    #[test]
    fn test_try_map_stops_at_first_error() {
        let matrix = RiskMatrix::<RawMeasure>::default();
        let mut calls = 0;
        let result = matrix.try_map(|path, _| {
            calls += 1;
            if path.category == Category::Integrity {
                Err(path)
            } else {
                Ok(())
            }
        });

        assert_eq!(calls, 4);
        assert_eq!(result.unwrap_err().attribute, Attribute::Reputation);
    }
}
