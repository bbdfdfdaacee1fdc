//! Application error types and HTTP response conversion.
//!
//! Defines a unified error type ([`AppError`]) that maps to HTTP status codes
//! and the public JSON error envelope `{"error": <code>, "message": <text>}`.
//! The `error` code strings are part of the public contract and must stay
//! stable across releases.
//!
//! ## Error Categories
//!
//! - [`AppError::Validation`] - Malformed input (400 Bad Request)
//! - [`AppError::Forbidden`] - URL policy rejection (403 Forbidden)
//! - [`AppError::NotFound`] - No row for code (404 Not Found)
//! - [`AppError::Gone`] - Row exists but is deleted or expired (410 Gone)
//! - [`AppError::Conflict`] - Code/alias already bound (409 Conflict)
//! - [`AppError::TooManyRequests`] - Admission denial (429)
//! - [`AppError::Internal`] - Store failure, serialization error, generator
//!   exhaustion (500 Internal Server Error)
//!
//! ## Database Error Mapping
//!
//! SQLx errors are converted via [`From<SqlxError>`]:
//! - Unique constraint violations → [`AppError::Conflict`] with code
//!   `code_conflict` (the service decides between retrying a generated code
//!   and surfacing `alias_exists`)
//! - Everything else → [`AppError::Internal`]
//!
//! All database errors emit `metrics::counter!` for monitoring.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sqlx::Error as SqlxError;
use validator::ValidationErrors;

/// JSON error envelope returned to API consumers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Application-level error with a public error code and HTTP mapping.
#[derive(Debug)]
pub enum AppError {
    Validation { code: &'static str, message: String },
    Forbidden { code: &'static str, message: String },
    NotFound { code: &'static str, message: String },
    Gone { code: &'static str, message: String },
    Conflict { code: &'static str, message: String },
    TooManyRequests { code: &'static str, message: String },
    Internal { code: &'static str, message: String },
}

impl AppError {
    /// Generic malformed-request error (400).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::Validation {
            code: "invalid_request",
            message: message.into(),
        }
    }

    /// The submitted URL does not parse as an absolute http(s) URL (400).
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::Validation {
            code: "invalid_url",
            message: message.into(),
        }
    }

    /// The submitted URL exceeds the configured length limit (400).
    pub fn url_too_long(message: impl Into<String>) -> Self {
        Self::Validation {
            code: "url_too_long",
            message: message.into(),
        }
    }

    /// The URL's host is blocked or not on the allow list (403).
    pub fn url_blocked(message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: "url_blocked",
            message: message.into(),
        }
    }

    /// No live row for the code (404).
    pub fn url_not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            code: "url_not_found",
            message: message.into(),
        }
    }

    /// The row exists but its expiry has passed (410).
    pub fn url_expired(message: impl Into<String>) -> Self {
        Self::Gone {
            code: "url_expired",
            message: message.into(),
        }
    }

    /// The row exists but was soft-deleted (410).
    pub fn url_deleted(message: impl Into<String>) -> Self {
        Self::Gone {
            code: "url_deleted",
            message: message.into(),
        }
    }

    /// The requested custom alias is already bound (409).
    pub fn alias_exists(message: impl Into<String>) -> Self {
        Self::Conflict {
            code: "alias_exists",
            message: message.into(),
        }
    }

    /// Admission control denied the request (429).
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::TooManyRequests {
            code: "rate_limit_exceeded",
            message: message.into(),
        }
    }

    /// Unexpected store or serialization failure (500).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "internal_error",
            message: message.into(),
        }
    }

    /// The generator exhausted its collision-retry budget (500).
    pub fn code_exhaustion(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "code_exhaustion",
            message: message.into(),
        }
    }

    /// The expiry cleanup batch failed (500).
    pub fn cleanup_failed(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "cleanup_failed",
            message: message.into(),
        }
    }

    /// Returns the public error code string.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Gone { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::TooManyRequests { code, .. }
            | AppError::Internal { code, .. } => code,
        }
    }

    /// True for unique-key conflicts, which the create loop treats as a
    /// generator collision when the code was not user-supplied.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict { .. })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Gone { .. } => StatusCode::GONE,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let (code, message) = match self {
            AppError::Validation { code, message }
            | AppError::Forbidden { code, message }
            | AppError::NotFound { code, message }
            | AppError::Gone { code, message }
            | AppError::Conflict { code, message }
            | AppError::TooManyRequests { code, message }
            | AppError::Internal { code, message } => (code, message),
        };

        (
            status,
            Json(ErrorBody {
                error: code,
                message,
            }),
        )
            .into_response()
    }
}

impl From<SqlxError> for AppError {
    fn from(e: SqlxError) -> Self {
        map_sqlx_error(e)
    }
}

/// Maps SQLx errors to application errors.
///
/// Unique-key violations become [`AppError::Conflict`]; connection and
/// protocol failures become [`AppError::Internal`]. Every class emits a
/// `database_errors_total` counter.
pub fn map_sqlx_error(e: SqlxError) -> AppError {
    match &e {
        SqlxError::Database(db_err) => {
            if db_err.is_unique_violation() {
                metrics::counter!("database_errors_total", "type" => "unique_violation")
                    .increment(1);

                let constraint = db_err.constraint().unwrap_or("unknown");
                tracing::debug!(constraint, "Unique constraint violated");

                return AppError::Conflict {
                    code: "code_conflict",
                    message: "Short code already exists".to_string(),
                };
            }

            tracing::error!(
                code = ?db_err.code(),
                message = ?db_err.message(),
                constraint = ?db_err.constraint(),
                "Unhandled database error"
            );
            metrics::counter!("database_errors_total", "type" => "other").increment(1);

            AppError::internal("Database operation failed")
        }

        SqlxError::RowNotFound => {
            metrics::counter!("database_errors_total", "type" => "row_not_found").increment(1);
            AppError::url_not_found("Record not found")
        }

        SqlxError::PoolTimedOut => {
            tracing::warn!("Database connection pool timed out");
            metrics::counter!("database_errors_total", "type" => "pool_timeout").increment(1);
            AppError::internal("Service temporarily unavailable")
        }

        SqlxError::PoolClosed => {
            tracing::error!("Database connection pool is closed");
            metrics::counter!("database_errors_total", "type" => "pool_closed").increment(1);
            AppError::internal("Service unavailable")
        }

        SqlxError::Io(_) => {
            tracing::warn!(error = ?e, "Database I/O error");
            metrics::counter!("database_errors_total", "type" => "io_error").increment(1);
            AppError::internal("Database connection issue")
        }

        _ => {
            tracing::error!(error = ?e, "Unexpected database error");
            metrics::counter!("database_errors_total", "type" => "unknown").increment(1);
            AppError::internal("Database operation failed")
        }
    }
}

impl std::error::Error for AppError {}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation { message, .. } => write!(f, "Validation error: {}", message),
            AppError::Forbidden { message, .. } => write!(f, "Forbidden: {}", message),
            AppError::NotFound { message, .. } => write!(f, "Not found: {}", message),
            AppError::Gone { message, .. } => write!(f, "Gone: {}", message),
            AppError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
            AppError::TooManyRequests { message, .. } => {
                write!(f, "Too many requests: {}", message)
            }
            AppError::Internal { message, .. } => write!(f, "Internal error: {}", message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        AppError::invalid_request(format!(
            "Request validation failed for: {}",
            fields.join(", ")
        ))
    }
}
