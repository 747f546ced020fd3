//! crates/notebook_core/src/error.rs
//!
//! The error type surfaced by the core services. The HTTP boundary maps each
//! variant onto a status code; nothing below it knows about HTTP.

use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing or malformed input.
    #[error("{0}")]
    InvalidInput(String),

    /// Missing, invalid or expired token, or bad credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// The target does not exist or is not owned by the caller.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The storage backend could not be reached.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<PortError> for ServiceError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => ServiceError::NotFound(msg),
            PortError::Conflict(msg) => ServiceError::Conflict(msg),
            PortError::Unavailable(msg) => ServiceError::UpstreamUnavailable(msg),
            PortError::Unexpected(msg) => ServiceError::Internal(msg),
        }
    }
}
