//! Ingestion Gate
//!
//! Validates an upload and writes it into the ingestion directory under its
//! sanitized name. The body is streamed into a temporary file next to the
//! destination and only renamed into place once the whole stream passed the
//! size check, so a rejected upload never leaves a file behind.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::AsyncWriteExt;

use super::sanitize::storage_name;
use super::types::{IngestError, SourceArtifact};

/// Accepts uploads into a single directory
#[derive(Debug, Clone)]
pub struct IngestionGate {
    dir: PathBuf,
    max_bytes: u64,
}

impl IngestionGate {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    /// Create the ingestion directory if missing. Safe to call repeatedly.
    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Validate the declared name, then stream `body` to disk.
    ///
    /// Fails with a validation error before touching the filesystem when the
    /// name is unacceptable, and part-way through the stream as soon as the
    /// running total passes the ceiling.
    pub async fn ingest<S, E>(&self, original_name: &str, body: S) -> Result<SourceArtifact, IngestError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let sanitized = storage_name(original_name)?;
        let destination = self.dir.join(&sanitized);

        self.ensure_dir().await?;

        // Dropping the handle before `persist` removes the partial file.
        let staging = tempfile::Builder::new()
            .prefix(".upload-")
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        let (std_file, staging_path) = staging.into_parts();
        let mut file = tokio::fs::File::from_std(std_file);

        let mut size: u64 = 0;
        let mut body = std::pin::pin!(body);
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| IngestError::Stream(e.to_string()))?;
            size += chunk.len() as u64;
            if size > self.max_bytes {
                tracing::warn!(
                    file_name = %original_name,
                    max_bytes = self.max_bytes,
                    "Upload rejected: exceeds size ceiling"
                );
                return Err(IngestError::TooLarge { max: self.max_bytes });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        staging_path
            .persist(&destination)
            .map_err(|e| IngestError::Storage(e.error))?;

        tracing::info!(
            original_name = %original_name,
            sanitized_name = %sanitized,
            size,
            "Upload stored"
        );

        Ok(SourceArtifact {
            original_name: original_name.to_string(),
            sanitized_name: sanitized,
            size,
            path: destination,
        })
    }
}
