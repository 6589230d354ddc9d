use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::meals::filter::FilterError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Filter(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            AppError::Validation(_) | AppError::Filter(_) => "Invalid request",
            AppError::Auth(_) => "Unauthorized",
            AppError::Forbidden => "Access forbidden",
            AppError::NotFound(_) => "Resource not found",
            AppError::Conflict(_) => "Conflict",
            AppError::Internal(ref e) => {
                tracing::error!(error = %e, "internal error");
                "Internal server error"
            }
        };

        // Internal causes stay in the log.
        let details = match self {
            AppError::Internal(_) => error_message.to_string(),
            ref other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "details": details,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
