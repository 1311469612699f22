//! # serviceapi Common Library
//!
//! Shared code for the serviceapi crates including:
//! - Database initialization, schema and migrations
//! - Shared models (owners, assets, indicators, RRA rows)
//! - Impact/probability label normalization
//! - Configuration loading and logging setup

pub mod config;
pub mod db;
pub mod error;
pub mod labels;
pub mod logging;

pub use error::{Error, Result};
pub use labels::{sanitize_impact_label, ImpactLabel, LabelError};
