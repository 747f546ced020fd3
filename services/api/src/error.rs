//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and how each
//! failure is presented to HTTP clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use notebook_core::ServiceError;
use serde_json::json;
use tracing::error;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A typed failure from the core services.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying schema migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A request body that failed to deserialize.
    #[error("{0}")]
    BadRequest(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(e) => match e {
                ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Conflict(_) => StatusCode::CONFLICT,
                ServiceError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
                ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message safe to show a client. Server-side failures get a generic
    /// text; their detail only reaches the log.
    fn client_message(&self) -> String {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            StatusCode::BAD_GATEWAY => "Storage is temporarily unavailable".to_string(),
            _ => match self {
                ApiError::Service(e) => e.to_string(),
                ApiError::BadRequest(msg) => msg.clone(),
                _ => "Request failed".to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
        }
        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebook_core::PortError;

    #[test]
    fn service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::UpstreamUnavailable("x".into()), StatusCode::BAD_GATEWAY),
            (ServiceError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ApiError::from(ServiceError::Internal("connection string leaked".into()));
        assert_eq!(err.client_message(), "Internal server error");

        let err = ApiError::from(ServiceError::NotFound("Book not found".into()));
        assert_eq!(err.client_message(), "Book not found");
    }

    #[test]
    fn storage_failures_reach_clients_through_service_errors() {
        let cases = [
            (PortError::NotFound("page 9".into()), StatusCode::NOT_FOUND),
            (PortError::Conflict("users_email_key".into()), StatusCode::CONFLICT),
            (PortError::Unavailable("pool timed out".into()), StatusCode::BAD_GATEWAY),
            (PortError::Unexpected("syntax error".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            let err = ApiError::from(ServiceError::from(err));
            assert_eq!(err.status(), status);
        }

        let unavailable = PortError::Unavailable("10.0.0.5:5432".into());
        let err = ApiError::from(ServiceError::from(unavailable));
        assert_eq!(err.client_message(), "Storage is temporarily unavailable");
    }
}
