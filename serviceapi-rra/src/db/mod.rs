//! Database access for serviceapi-rra

pub mod rra;

pub use rra::{count_rras, latest_rra, load_rra, upsert_rra, RraRow, UpsertOutcome};
