//! Risk matrix flattening
//!
//! Maps the nested risk matrix onto the 18 scalar columns of the `rra`
//! table. The column order is part of the storage contract and must never
//! change: availability, confidentiality, integrity; within each,
//! reputation, productivity, finances; within each, impact then probability.

use crate::document::{Measure, RiskCategory, RiskMatrix};
use serviceapi_common::ImpactLabel;

/// Number of flattened risk columns
pub const RISK_COLUMN_COUNT: usize = 18;

/// The 18 risk values in storage column order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatRisk {
    values: [ImpactLabel; RISK_COLUMN_COUNT],
}

impl FlatRisk {
    /// Column names, in the same order as [`FlatRisk::values`]
    #[rustfmt::skip]
    pub const COLUMNS: [&'static str; RISK_COLUMN_COUNT] = [
        "ari", "arp", "api", "app", "afi", "afp",
        "cri", "crp", "cpi", "cpp", "cfi", "cfp",
        "iri", "irp", "ipi", "ipp", "ifi", "ifp",
    ];

    pub fn values(&self) -> &[ImpactLabel; RISK_COLUMN_COUNT] {
        &self.values
    }

    /// Value stored in the named column
    pub fn get(&self, column: &str) -> Option<ImpactLabel> {
        Self::COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.values[i])
    }

    /// (column, value) pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, ImpactLabel)> + '_ {
        Self::COLUMNS.iter().copied().zip(self.values.iter().copied())
    }
}

/// Flatten a sanitized risk matrix
///
/// Performs no validation; the input must already have been validated.
#[rustfmt::skip]
pub fn flatten(risk: &RiskMatrix<Measure>) -> FlatRisk {
    let [ari, arp, api, app, afi, afp] = category_values(&risk.availability);
    let [cri, crp, cpi, cpp, cfi, cfp] = category_values(&risk.confidentiality);
    let [iri, irp, ipi, ipp, ifi, ifp] = category_values(&risk.integrity);

    FlatRisk {
        values: [
            ari, arp, api, app, afi, afp,
            cri, crp, cpi, cpp, cfi, cfp,
            iri, irp, ipi, ipp, ifi, ifp,
        ],
    }
}

fn category_values(category: &RiskCategory<Measure>) -> [ImpactLabel; 6] {
    [
        category.reputation.impact,
        category.reputation.probability,
        category.productivity.impact,
        category.productivity.probability,
        category.finances.impact,
        category.finances.probability,
    ]
}
