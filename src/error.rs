use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::types::TenantId;

/// A tenant whose index failed to close during [`crate::IndexRegistry::release_all`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseFailure {
    pub tenant_id: TenantId,
    pub message: String,
}

#[derive(Error, Debug, Clone)]
pub enum TenantdexError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No open index for tenant '{0}'")]
    NotFound(TenantId),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Failed to close {} index(es): {}", .0.len(), format_close_failures(.0))]
    CloseFailed(Vec<CloseFailure>),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TenantdexError>;

fn format_close_failures(failures: &[CloseFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("tenant '{}': {}", f.tenant_id, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<std::io::Error> for TenantdexError {
    fn from(e: std::io::Error) -> Self {
        TenantdexError::Storage(e.to_string())
    }
}

impl From<tantivy::TantivyError> for TenantdexError {
    fn from(e: tantivy::TantivyError) -> Self {
        TenantdexError::Storage(e.to_string())
    }
}

impl From<tantivy::directory::error::OpenDirectoryError> for TenantdexError {
    fn from(e: tantivy::directory::error::OpenDirectoryError) -> Self {
        TenantdexError::Storage(e.to_string())
    }
}

impl From<std::convert::Infallible> for TenantdexError {
    fn from(e: std::convert::Infallible) -> Self {
        match e {}
    }
}

impl TenantdexError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            TenantdexError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            TenantdexError::NotFound(_) => StatusCode::NOT_FOUND,
            TenantdexError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TenantdexError::CloseFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TenantdexError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code, used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            TenantdexError::InvalidArgument(_) => "invalid_argument",
            TenantdexError::NotFound(_) => "not_found",
            TenantdexError::Storage(_) => "storage_error",
            TenantdexError::CloseFailed(_) => "close_failed",
            TenantdexError::Config(_) => "config_error",
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

// Axum IntoResponse implementation (feature-gated)
#[cfg(feature = "axum-support")]
use axum::response::{IntoResponse, Json, Response};

#[cfg(feature = "axum-support")]
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(feature = "axum-support")]
impl IntoResponse for TenantdexError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            TenantdexError::InvalidArgument("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TenantdexError::NotFound("acme".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TenantdexError::Storage("disk".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            TenantdexError::CloseFailed(vec![]).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn close_failed_message_names_every_tenant() {
        let err = TenantdexError::CloseFailed(vec![
            CloseFailure {
                tenant_id: "alpha".into(),
                message: "lock lost".into(),
            },
            CloseFailure {
                tenant_id: "beta".into(),
                message: "io".into(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to close 2 index(es)"), "{msg}");
        assert!(msg.contains("tenant 'alpha': lock lost"), "{msg}");
        assert!(msg.contains("tenant 'beta': io"), "{msg}");
    }

    #[test]
    fn io_errors_become_storage_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: TenantdexError = io.into();
        assert_eq!(err.kind(), "storage_error");
        assert!(!err.is_client_error());
    }
}
