//! Upload route
//!
//! `POST /api/upload-pdf` takes a multipart body with the document in the
//! `pdf` field and an optional `mode` text field (`flatten` by default, or
//! `protect`). The upload is stored through the ingestion gate, transformed,
//! and answered with a download link for the result.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::pipeline::{Strategy, TransformOutcome};
use crate::state::AppState;
use crate::upload::{IngestError, SourceArtifact};

/// Multipart field carrying the document
pub const FILE_FIELD: &str = "pdf";

/// Multipart field selecting the strategy
pub const MODE_FIELD: &str = "mode";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// ============================================================================
// Response
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub download_url: String,
    pub filename: String,
    pub size_mb: f64,
    pub status: &'static str,
    pub mode: &'static str,
    pub pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
    /// Wall-clock time of the transformation
    pub elapsed_ms: u64,
}

impl From<&TransformOutcome> for UploadResponse {
    fn from(outcome: &TransformOutcome) -> Self {
        let message = match (outcome.strategy, outcome.dpi) {
            (Strategy::Flatten, Some(dpi)) => format!("PDF flattened successfully at {} DPI", dpi),
            (Strategy::Flatten, None) => "PDF flattened successfully".to_string(),
            (Strategy::Restrict, _) => "PDF protected successfully".to_string(),
        };

        Self {
            message,
            download_url: download_url(&outcome.artifact.file_name),
            filename: outcome.artifact.file_name.clone(),
            size_mb: size_mb(outcome.artifact.size),
            status: "OK",
            mode: outcome.strategy.mode_name(),
            pages: outcome.pages,
            dpi: outcome.dpi,
            elapsed_ms: outcome.elapsed_ms,
        }
    }
}

pub fn download_url(file_name: &str) -> String {
    format!("/api/download/{}", file_name)
}

/// Size in MiB, rounded to two decimals
pub fn size_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

// ============================================================================
// Handler
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new().route("/api/upload-pdf", post(upload_pdf))
}

async fn upload_pdf(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<UploadResponse>> {
    let mut strategy = Strategy::default();
    let mut source: Option<SourceArtifact> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IngestError::Stream(e.to_string()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(MODE_FIELD) => {
                let mode = field
                    .text()
                    .await
                    .map_err(|e| IngestError::Stream(e.to_string()))?;
                strategy = Strategy::from_mode(&mode)
                    .ok_or_else(|| AppError::BadRequest(format!("Unknown mode '{}'", mode.trim())))?;
            }
            Some(FILE_FIELD) if source.is_none() => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                source = Some(state.gate().ingest(&file_name, field).await?);
            }
            // Unknown parts and extra files are skipped
            _ => {}
        }
    }

    let source = source.ok_or(IngestError::MissingFile(FILE_FIELD))?;

    let outcome = state.pipeline().run(strategy, &source).await?;

    Ok(Json(UploadResponse::from(&outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_mb_rounding() {
        assert_eq!(size_mb(0), 0.0);
        assert_eq!(size_mb(1024 * 1024), 1.0);
        assert_eq!(size_mb(1_572_864), 1.5);
        assert_eq!(size_mb(12_345), 0.01);
    }

    #[test]
    fn test_download_url() {
        assert_eq!(download_url("flattened_a.pdf"), "/api/download/flattened_a.pdf");
    }
}
