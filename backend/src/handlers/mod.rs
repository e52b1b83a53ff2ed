//! HTTP request handlers

pub mod health;
pub mod product;
pub mod purchase;

pub use health::*;
pub use product::*;
pub use purchase::*;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};

use crate::error::AppError;

/// Malformed bodies are reported through the envelope like any other validation error
pub(crate) fn body_rejection(rejection: JsonRejection) -> AppError {
    AppError::validation("body", rejection.body_text())
}

pub(crate) fn path_rejection(rejection: PathRejection) -> AppError {
    AppError::validation("id_producto", rejection.body_text())
}

pub(crate) fn query_rejection(rejection: QueryRejection) -> AppError {
    AppError::validation("query", rejection.body_text())
}
