//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::IdentifierError;
use domain::documents::DocumentError;
use domain::{DomainError, RepositoryError, ValidationError};
use monitoring::{MonitoringError, TransportError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Monitoring or transport error.
    Monitoring(MonitoringError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => (domain_status(&err), err.to_string()),
            ApiError::Monitoring(err) => (monitoring_status(&err), err.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }
        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_illegal_transition() || err.is_conflict() {
        StatusCode::CONFLICT
    } else {
        match err {
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Repository(repo) => repository_status(repo),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn monitoring_status(err: &MonitoringError) -> StatusCode {
    match err {
        MonitoringError::NotMonitoring(_) | MonitoringError::AlreadyMonitoring(_) => {
            StatusCode::CONFLICT
        }
        MonitoringError::Transport(TransportError::Disconnected | TransportError::TimedOut(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        MonitoringError::Repository(repo) => repository_status(repo),
        MonitoringError::Domain(inner) => domain_status(inner),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    if err.is_transient() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Domain(err.into())
    }
}

impl From<DocumentError> for ApiError {
    fn from(err: DocumentError) -> Self {
        ApiError::Domain(RepositoryError::from(err).into())
    }
}

impl From<IdentifierError> for ApiError {
    fn from(err: IdentifierError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<MonitoringError> for ApiError {
    fn from(err: MonitoringError) -> Self {
        ApiError::Monitoring(err)
    }
}
