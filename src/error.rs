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

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message suitable for showing on screen.
    ///
    /// Platform errors keep the platform's own message; everything else falls
    /// back to a fixed sentence for its category.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized => "User is not signed in".to_string(),
            AppError::Auth(msg) if !msg.is_empty() => msg.clone(),
            AppError::Auth(_) => "Invalid credentials".to_string(),
            AppError::PermissionDenied => "Location permission was not granted".to_string(),
            AppError::NotFound(_) => "User not found".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Database(msg) | AppError::Storage(msg) if !msg.is_empty() => msg.clone(),
            AppError::Database(_) => "Error saving user data".to_string(),
            AppError::Storage(_) => "Error uploading file".to_string(),
            AppError::Internal(_) => "Unexpected error".to_string(),
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
            AppError::Auth(_) => (
                StatusCode::UNAUTHORIZED,
                "auth_failed",
                Some(self.user_message()),
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                "permission_denied",
                Some(self.user_message()),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::BAD_GATEWAY, "database_error", Some(msg.clone()))
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::BAD_GATEWAY, "storage_error", Some(msg.clone()))
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
