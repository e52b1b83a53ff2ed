//! Error handling for the stock intake core
//!
//! Every failure is classified as validation, not-found, conflict or internal,
//! and rendered as the `{ status, code, msg, data, error }` envelope.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use shared::MoneyError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error on {field}: {message}")]
    Validation {
        field: String,
        code: &'static str,
        message: String,
    },

    #[error("Not found: {message}")]
    NotFound { code: &'static str, message: String },

    #[error("Conflict: {message}")]
    Conflict { code: &'static str, message: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Transaction exceeded {0:?}")]
    Timeout(Duration),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Coarse error class exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            code: "VALIDATION_ERROR",
            message: message.into(),
        }
    }

    pub fn invalid(field: &str, code: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            code,
            message: message.into(),
        }
    }

    /// An amount that overflows or does not fit the monetary columns
    pub fn amount_out_of_range(field: &str) -> Self {
        AppError::invalid(field, "INVALID_AMOUNT", "amount is out of range")
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        AppError::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::Conflict { .. } => ErrorKind::Conflict,
            AppError::DatabaseError(_) | AppError::Timeout(_) | AppError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Machine-readable error tag
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. } => code,
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Timeout(_) => "TRANSACTION_TIMEOUT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable message; store details never leak to callers
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation { field, message, .. } => format!("{}: {}", field, message),
            AppError::NotFound { message, .. } | AppError::Conflict { message, .. } => {
                message.clone()
            }
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::Timeout(_) => "The operation took too long and was rolled back".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl From<MoneyError> for AppError {
    fn from(err: MoneyError) -> Self {
        let message = format!("'{}' is not a valid amount", err.input);
        AppError::Validation {
            field: err.field,
            code: "INVALID_AMOUNT",
            message,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "payload".to_string());
        AppError::Validation {
            field,
            code: "VALIDATION_ERROR",
            message: errors.to_string(),
        }
    }
}

/// Result type alias for services and repositories
pub type AppResult<T> = Result<T, AppError>;

/// Uniform result envelope returned to the web layer
#[derive(Debug, Serialize)]
pub struct ServiceResponse<T> {
    pub status: bool,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ServiceResponse<T> {
    pub fn success(code: StatusCode, msg: impl Into<String>, data: T) -> Self {
        Self {
            status: true,
            code: code.as_u16(),
            msg: Some(msg.into()),
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(err: &AppError) -> Self {
        match err.kind() {
            ErrorKind::Internal => tracing::error!("Error: {:?}", err),
            _ => tracing::debug!("Rejected: {:?}", err),
        }

        Self {
            status: false,
            code: err.status().as_u16(),
            msg: Some(err.public_message()),
            data: None,
            error: Some(err.code().to_string()),
        }
    }

    /// Build the envelope for a finished operation
    pub fn from_result(result: AppResult<T>, code: StatusCode, msg: &str) -> Self {
        match result {
            Ok(data) => Self::success(code, msg, data),
            Err(err) => Self::failure(&err),
        }
    }
}

impl<T: Serialize> IntoResponse for ServiceResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ServiceResponse::<()>::failure(&self).into_response()
    }
}
