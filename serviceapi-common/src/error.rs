//! Errors shared by the serviceapi crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Creating the database directory failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file missing, unreadable or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Lookup or update of an asset (or the database file) that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-supplied value rejected before touching storage
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
