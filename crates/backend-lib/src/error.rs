// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
//!
//! [`AppError::handle_error`] is the single place where an error becomes an
//! HTTP response. Every handler funnels its failures through it.
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

use crate::validation::Issue;

/// Body returned for anything that is not explicitly classified.
pub const GENERIC_ERROR_BODY: &str =
    "Something went wrong on our end. We've been notified and will look into it";

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid Session")]
    InvalidSession,

    #[error("Access denied")]
    AccessDenied,

    #[error("Resource not found")]
    ResourceNotFound,

    #[error("{0}")]
    CollectionAlreadyExists(String),

    #[error("Schema validation failed with {} issue(s)", .0.len())]
    SchemaValidation(Vec<Issue>),

    #[error("Unreadable request body: {0}")]
    UnreadableBody(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidSession => StatusCode::UNAUTHORIZED,
            AppError::ResourceNotFound => StatusCode::NOT_FOUND,
            AppError::AccessDenied => StatusCode::FORBIDDEN,
            AppError::SchemaValidation(_) => StatusCode::BAD_REQUEST,
            AppError::CollectionAlreadyExists(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidSession => "AUTH_001",
            AppError::AccessDenied => "AUTH_002",
            AppError::ResourceNotFound => "NF_001",
            AppError::CollectionAlreadyExists(_) => "CONFLICT_001",
            AppError::SchemaValidation(_) => "VAL_001",
            AppError::UnreadableBody(_) => "VAL_002",
            AppError::Io(_) => "IO_001",
            AppError::Json(_) => "JSON_001",
            AppError::PasswordHash(_) => "AUTH_003",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Map this error to the response the client sees.
    ///
    /// Total over every variant; unclassified errors become a 500 with a
    /// generic body so internal details never leak.
    pub fn handle_error(&self) -> Response {
        let status = self.status_code();
        match self {
            AppError::InvalidSession => (status, "Invalid Session").into_response(),
            AppError::ResourceNotFound => (status, "Resource not found").into_response(),
            AppError::AccessDenied => (status, "Access denied").into_response(),
            AppError::SchemaValidation(issues) => {
                debug!(issues = issues.len(), "rejecting request with schema issues");
                match serde_json::to_string(issues) {
                    Ok(body) => {
                        (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
                    },
                    Err(err) => {
                        error!(%err, "failed to serialize validation issues");
                        (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_BODY).into_response()
                    },
                }
            },
            AppError::CollectionAlreadyExists(message) => (status, message.clone()).into_response(),
            other => {
                error!(code = other.error_code(), error = %other, "unhandled error");
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_BODY).into_response()
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.handle_error()
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("blocking task failed: {err}"))
    }
}
