//! Artifact download route

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/download/:filename", get(download))
}

/// Serve a published artifact as an attachment
async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> Result<Response> {
    let artifact = state.store().open(&filename).await?;

    tracing::debug!(file_name = %artifact.file_name, size = artifact.data.len(), "Serving artifact");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, artifact.data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.file_name),
        )
        .body(Body::from(artifact.data))
        .map_err(|e| AppError::Internal(e.to_string()))
}
