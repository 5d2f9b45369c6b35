//! Error handling for the bookshelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Message sent with every 5xx response; the cause travels in `detail`.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Standard error response format for all HTTP errors
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<serde_json::Value>,
    pub trace_id: String,
    pub timestamp: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation error: {message}")]
    Validation {
        details: Vec<serde_json::Value>,
        code: String,
        message: String,
    },

    #[error("not found: {message}")]
    NotFound { message: String, code: String },

    /// A backing service (document store, image store) failed.
    #[error("upstream failure: {detail}")]
    Upstream { detail: String, code: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a validation error
    pub fn validation(details: Vec<serde_json::Value>, message: impl Into<String>) -> Self {
        Self::Validation {
            details,
            code: "validation_error".to_string(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            code: "not_found".to_string(),
        }
    }

    /// Create an upstream error carrying the cause as detail
    pub fn upstream(detail: impl std::fmt::Display) -> Self {
        Self::Upstream {
            detail: detail.to_string(),
            code: "upstream_error".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Upstream { .. } | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let trace_id = Uuid::now_v7();
        let timestamp = OffsetDateTime::now_utc().to_string();

        let (code, message, detail, details) = match self {
            AppError::Validation {
                details,
                code,
                message,
            } => (code, message, None, details),
            AppError::NotFound { message, code } => (code, message, None, Vec::new()),
            AppError::Upstream { detail, code } => (
                code,
                INTERNAL_ERROR_MESSAGE.to_string(),
                Some(detail),
                Vec::new(),
            ),
            AppError::Internal(e) => {
                // Unclassified failures keep their cause out of release responses.
                let detail = if cfg!(debug_assertions) {
                    Some(format!("{e:#}"))
                } else {
                    None
                };
                (
                    "internal_error".to_string(),
                    INTERNAL_ERROR_MESSAGE.to_string(),
                    detail,
                    Vec::new(),
                )
            }
        };

        if status.is_server_error() {
            tracing::error!(
                trace_id = %trace_id,
                error_code = %code,
                status_code = %status.as_u16(),
                detail = detail.as_deref().unwrap_or_default(),
                "request failed"
            );
        } else {
            tracing::info!(
                trace_id = %trace_id,
                error_code = %code,
                status_code = %status.as_u16(),
                %message,
                "request rejected"
            );
        }

        let body = ErrorBody {
            message,
            detail,
            code,
            details,
            trace_id: trace_id.to_string(),
            timestamp,
        };

        (status, Json(body)).into_response()
    }
}
