//! Impact and probability label normalization
//!
//! RRA documents describe every risk attribute with an impact and a
//! probability label. Only a small closed vocabulary is accepted; labels are
//! compared case-insensitively and stored in their lower-case canonical form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Label rejected by [`sanitize_impact_label`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid impact label {0:?}")]
pub struct LabelError(pub String);

/// Canonical impact/probability classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLabel {
    Unknown,
    Low,
    Medium,
    High,
    Maximum,
}

impl ImpactLabel {
    /// All recognized labels, lowest to highest
    pub const ALL: [ImpactLabel; 5] = [
        ImpactLabel::Unknown,
        ImpactLabel::Low,
        ImpactLabel::Medium,
        ImpactLabel::High,
        ImpactLabel::Maximum,
    ];

    /// Canonical string stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactLabel::Unknown => "unknown",
            ImpactLabel::Low => "low",
            ImpactLabel::Medium => "medium",
            ImpactLabel::High => "high",
            ImpactLabel::Maximum => "maximum",
        }
    }
}

impl fmt::Display for ImpactLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImpactLabel {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        sanitize_impact_label(s)
    }
}

/// Normalize a raw impact or probability label
///
/// Surrounding whitespace is ignored and matching is case-insensitive. Any
/// value outside the recognized vocabulary, including the empty string, is
/// rejected.
pub fn sanitize_impact_label(raw: &str) -> Result<ImpactLabel, LabelError> {
    let normalized = raw.trim().to_lowercase();
    ImpactLabel::ALL
        .into_iter()
        .find(|label| label.as_str() == normalized)
        .ok_or_else(|| LabelError(raw.to_string()))
}
