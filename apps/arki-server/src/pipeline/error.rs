//! Pipeline errors

use thiserror::Error;

use crate::storage::StoreError;

/// Failures of a single transformation run.
///
/// Clients only ever see a generic message; the variant and its detail are
/// for the server log.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to decode PDF: {0}")]
    Decode(String),

    #[error("Rasterization engine error: {0}")]
    Engine(String),

    #[error("Failed to render page {page}: {detail}")]
    Render { page: usize, detail: String },

    #[error("Image encoding error: {0}")]
    Image(String),

    #[error("Failed to assemble PDF: {0}")]
    Assemble(String),

    #[error("Document is already encrypted")]
    AlreadyEncrypted,

    #[error("Failed to encrypt PDF: {0}")]
    Encrypt(String),

    #[error("Document has no pages")]
    NoPages,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline timed out after {0}s")]
    Timeout(u64),

    #[error("Pipeline run was cancelled")]
    Cancelled,

    #[error("Task join error: {0}")]
    Join(String),
}

impl PipelineError {
    /// Stable machine-readable code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "PIPELINE_TIMEOUT",
            _ => "PIPELINE_FAILED",
        }
    }
}
