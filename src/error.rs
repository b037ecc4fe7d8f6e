// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Network failure, timeout or non-2xx status while reading from the task store.
    #[error("Task store fetch failed: {1}")]
    FetchFailed(FetchFailure, String),

    /// Network failure, timeout or non-2xx status while creating/updating a record.
    #[error("Task store write failed: {0}")]
    WriteFailed(String),

    /// Local flag storage could not be read or written.
    #[error("Local storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Cause of a task store read failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    /// The bounded request timeout elapsed.
    Timeout,
    /// The store could not be reached.
    Connect,
    /// Non-2xx status other than 404.
    Status(u16),
    /// The body was not a recognized listing.
    Decode,
    Other,
}

impl AppError {
    /// Whether a read failure looks transient (timeout, connection or 5xx).
    ///
    /// Nothing retries automatically; this only drives log levels and lets
    /// clients decide whether a "try again" affordance makes sense.
    pub fn is_retryable_fetch(&self) -> bool {
        match self {
            AppError::FetchFailed(FetchFailure::Timeout | FetchFailure::Connect, _) => true,
            AppError::FetchFailed(FetchFailure::Status(status), _) => *status >= 500,
            _ => false,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::FetchFailed(_, msg) => {
                (StatusCode::BAD_GATEWAY, "fetch_failed", Some(msg.clone()))
            }
            AppError::WriteFailed(msg) => {
                (StatusCode::BAD_GATEWAY, "write_failed", Some(msg.clone()))
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Local storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
