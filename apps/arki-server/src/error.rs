//! Error types for the ARKI server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::pipeline::PipelineError;
use crate::storage::StoreError;
use crate::upload::IngestError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl AppError {
    /// Status, machine code and client-facing message.
    ///
    /// Server-side causes are logged here and never reach the client.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Ingest(e) if e.is_validation() => {
                tracing::warn!(code = e.code(), "Upload rejected: {}", e);
                (StatusCode::BAD_REQUEST, e.code(), e.to_string())
            }
            AppError::Ingest(e) => {
                tracing::error!("Upload storage error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    e.code(),
                    "Failed to store the upload".to_string(),
                )
            }
            AppError::Pipeline(e) => {
                tracing::error!("Pipeline error: {}", e);
                let message = match e {
                    PipelineError::Timeout(_) => "Processing the PDF took too long",
                    _ => "Failed to process the PDF",
                };
                (StatusCode::INTERNAL_SERVER_ERROR, e.code(), message.to_string())
            }
            AppError::Store(StoreError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "File not found".to_string())
            }
            AppError::Store(e) => {
                tracing::error!("Artifact store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Storage error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
