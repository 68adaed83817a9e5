//! Error types for herdbook-breeding
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Domain rejections (`NotFound`, `Forbidden`,
//! `InvalidTransition`) are distinct from infrastructure failures
//! (`Database`, `Io`) so callers can map them to different responses;
//! domain rejections are never retried.

use crate::offspring::state::TransitionViolation;
use thiserror::Error;

/// Main error type for herdbook-breeding
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Referenced plan/group/offspring does not exist for the tenant
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authorization check failed (e.g., non-admin attempting unlink)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An offspring state invariant was violated by a patch
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] TransitionViolation),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<herdbook_common::Error> for Error {
    fn from(e: herdbook_common::Error) -> Self {
        match e {
            herdbook_common::Error::Database(e) => Error::Database(e),
            herdbook_common::Error::Io(e) => Error::Io(e),
            herdbook_common::Error::NotFound(msg) => Error::NotFound(msg),
            herdbook_common::Error::Config(msg) | herdbook_common::Error::Internal(msg) => {
                Error::Internal(msg)
            }
        }
    }
}

/// Convenience Result type using herdbook-breeding Error
pub type Result<T> = std::result::Result<T, Error>;
