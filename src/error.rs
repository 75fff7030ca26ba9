//! Error types for Postboard
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::data::StoreError;

/// Message returned when an OAuth login resolves to an email that already has an account.
pub const DUPLICATE_USER_MESSAGE: &str = "user already exists, redirecting to login";

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// No valid session (401)
    #[error("Authentication required")]
    NotAuthenticated,

    /// Malformed request (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Well-formed request with out-of-range values (422)
    #[error("Unprocessable entity: {0}")]
    Unprocessable(String),

    /// OAuth login for an email that already has an account (307)
    #[error("user already exists, redirecting to login")]
    DuplicateUser,

    /// OAuth handshake failed: bad state, provider error, expired flow (401)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Query exceeded its deadline (500)
    #[error("Database query timed out")]
    QueryTimeout,

    /// Local file storage error (500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// HTTP client error talking to the OAuth provider (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encryption/decryption error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound,
            StoreError::DuplicateUser => AppError::DuplicateUser,
            StoreError::Timeout => AppError::QueryTimeout,
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string(), "not_found"),
            AppError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                self.to_string(),
                "not_authenticated",
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                msg.clone(),
                "unprocessable",
            ),
            AppError::DuplicateUser => {
                crate::metrics::ERRORS_TOTAL
                    .with_label_values(&["duplicate_user"])
                    .inc();
                let body = Json(serde_json::json!({ "message": DUPLICATE_USER_MESSAGE }));
                return (StatusCode::TEMPORARY_REDIRECT, body).into_response();
            }
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone(), "auth"),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string(), "http_client"),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    "database",
                )
            }
            AppError::QueryTimeout => (
                StatusCode::INTERNAL_SERVER_ERROR,
                self.to_string(),
                "query_timeout",
            ),
            AppError::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "storage"),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Encryption(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "encryption")
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "internal",
                )
            }
        };

        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[error_type])
            .inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
