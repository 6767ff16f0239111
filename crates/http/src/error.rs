//! Error handling for the Libris HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Body shape shared by every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Message returned in place of internal failure details
pub const INTERNAL_MESSAGE: &str = "internal";

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a bad request error; the message is echoed to the caller
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::now_v7();
        let status = self.status();

        let message = match self {
            AppError::BadRequest { message } | AppError::NotFound { message } => {
                tracing::warn!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    message = %message,
                    "Request rejected"
                );
                message
            }
            AppError::Internal(e) => {
                tracing::error!(
                    error_id = %error_id,
                    status_code = %status.as_u16(),
                    error = ?e,
                    "Request failed"
                );
                INTERNAL_MESSAGE.to_string()
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
