use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    /// User-correctable input problem, carries a machine-readable code like `title_empty`.
    #[error("{0}")]
    Validation(String),

    #[error("Permission denied")]
    Permission,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn validation(code: &str) -> Self {
        AppError::Validation(code.to_string())
    }

    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(what.to_string())
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::MalformedPayload => "ValueError",
            AppError::Permission => "PermissionError",
            AppError::NotFound(_) => "NotFoundError",
            AppError::Store(_) | AppError::Config(_) | AppError::Io(_) => "InternalError",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Validation { .. } | AppError::MalformedPayload => StatusCode::BAD_REQUEST,
            AppError::Permission => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Store { .. } | AppError::Config { .. } | AppError::Io { .. } => {
                error!("Request failed: {self}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            AppError::Validation(code) => code.clone(),
            other => other.to_string(),
        };

        (
            status,
            Json(json!({ "__type__": self.kind(), "message": message })),
        )
            .into_response()
    }
}
