//! Domain services for matching, chat, and profiles
//!
//! Services hold the storage handles they operate on; nothing here reads
//! global state or performs authentication. Operations come in two error
//! registers: mutations return `ServiceError` so callers see exactly what
//! went wrong, while read paths that feed a screen degrade to an empty or
//! neutral value and log instead of failing the whole view.

use thiserror::Error;

use datastore::StoreError;

pub mod chat;
pub mod matches;
pub mod profiles;

/// Errors surfaced by the domain services.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// The caller supplied an argument the operation cannot accept.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying store failed or the entity is missing.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Type alias for service results
pub type ServiceResult<T> = Result<T, ServiceError>;
