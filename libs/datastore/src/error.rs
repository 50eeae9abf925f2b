//! Error types for the storage layer

use thiserror::Error;

/// Errors surfaced by storage providers.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The referenced record does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// PostgreSQL provider failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be decoded into its domain type
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(err.to_string())
    }
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
