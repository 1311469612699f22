//! serviceapi-rra - Risk Rating Assessment import
//!
//! Parses RRA documents exported by the RRA index, sanitizes their risk
//! classification labels, flattens the risk matrix into the `rra` table
//! columns and stores each document keyed by (service, lastmodified).

pub mod db;
pub mod document;
pub mod error;
pub mod flatten;
pub mod import;
pub mod validate;

pub use document::{RraDocument, RiskMatrix};
pub use error::{ImportError, ImportResult};
pub use flatten::{flatten, FlatRisk};
pub use import::{parse_batch, ImportOptions, ImportReport, RraImporter};
pub use validate::{validate, SanitizedRra, Validated, ValidationWarning};
