//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Asset type used for host assets
pub const ASSET_TYPE_HOSTNAME: &str = "hostname";

/// Stored RRA row
///
/// The risk columns are named by category, attribute and measure initials,
/// e.g. `cfp` is confidentiality / finances / probability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RraRecord {
    pub service: String,
    pub ari: String,
    pub arp: String,
    pub api: String,
    pub app: String,
    pub afi: String,
    pub afp: String,
    pub cri: String,
    pub crp: String,
    pub cpi: String,
    pub cpp: String,
    pub cfi: String,
    pub cfp: String,
    pub iri: String,
    pub irp: String,
    pub ipi: String,
    pub ipp: String,
    pub ifi: String,
    pub ifp: String,
    pub datadefault: String,
    pub lastupdated: DateTime<Utc>,
    pub lastmodified: DateTime<Utc>,
    pub raw: String,
}

/// Triage key for an operator/team pair
pub fn triage_key(operator: &str, team: &str) -> String {
    format!("{}-{}", operator, team)
}

/// Asset owner
///
/// The triage key is derived when the owner is built and cannot be set
/// independently, including when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "OwnerFields")]
pub struct Owner {
    operator: String,
    team: String,
    triage_key: String,
}

#[derive(Deserialize)]
struct OwnerFields {
    operator: String,
    team: String,
}

impl From<OwnerFields> for Owner {
    fn from(fields: OwnerFields) -> Self {
        Owner::new(fields.operator, fields.team)
    }
}

impl Owner {
    pub fn new(operator: impl Into<String>, team: impl Into<String>) -> Self {
        let operator = operator.into();
        let team = team.into();
        let triage_key = triage_key(&operator, &team);
        Self {
            operator,
            team,
            triage_key,
        }
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn triage_key(&self) -> &str {
        &self.triage_key
    }
}

/// A fact about an asset reported by an event source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Indicator {
    pub id: i64,
    #[serde(rename = "assetID")]
    pub asset_id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_source: String,
    pub likelihood: String,
    /// Opaque payload, not interpreted here
    pub details: serde_json::Value,
}

/// Asset with its owner and indicators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: i64,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub name: String,
    pub zone: String,
    pub description: String,
    #[serde(rename = "assetGroupID")]
    pub asset_group_id: Option<i64>,
    pub owner: Option<Owner>,
    pub last_indicator: Option<DateTime<Utc>>,
    pub indicators: Vec<Indicator>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triage_key_is_operator_dash_team() {
        let owner = Owner::new("operator", "testservice");
        assert_eq!(owner.triage_key(), "operator-testservice");

        let owner = Owner::new("", "");
        assert_eq!(owner.triage_key(), "-");

        let owner = Owner::new("it-ops", "web-team");
        assert_eq!(owner.triage_key(), "it-ops-web-team");
    }

    #[test]
    fn test_deserialize_recomputes_triage_key() {
        let owner: Owner = serde_json::from_str(
            r#"{"operator":"op","team":"t","triageKey":"something-else"}"#,
        )
        .unwrap();
        assert_eq!(owner.triage_key(), "op-t");
    }

    #[test]
    fn test_asset_json_field_names() {
        let asset = Asset {
            id: 1,
            asset_type: ASSET_TYPE_HOSTNAME.to_string(),
            name: "testhost1.mozilla.com".to_string(),
            zone: String::new(),
            description: String::new(),
            asset_group_id: Some(1),
            owner: Some(Owner::new("operator", "testservice")),
            last_indicator: None,
            indicators: vec![],
        };

        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["assetGroupID"], 1);
        assert_eq!(json["type"], "hostname");
        assert_eq!(json["owner"]["triageKey"], "operator-testservice");
    }
}
