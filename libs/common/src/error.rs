//! Error types shared across services

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Errors raised while connecting to or querying PostgreSQL.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred while establishing the connection
    #[error("database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred while executing a query
    #[error("database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred while applying the schema at startup
    #[error("database schema error: {0}")]
    Schema(String),

    /// Configuration error
    #[error("database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
