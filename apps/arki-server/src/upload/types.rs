//! Ingestion types

use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Extensions accepted by the ingestion gate (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];

/// Longest single path component most filesystems accept
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Room kept for the prefix the pipeline puts in front of output names
pub const OUTPUT_PREFIX_RESERVE: usize = 16;

/// Longest storage name the gate hands out
pub const MAX_STORAGE_NAME_BYTES: usize = MAX_FILE_NAME_BYTES - OUTPUT_PREFIX_RESERVE;

// ============================================================================
// Source Artifact
// ============================================================================

/// An accepted upload, stored under its sanitized name
#[derive(Debug, Clone)]
pub struct SourceArtifact {
    /// Filename exactly as the client sent it (untrusted)
    pub original_name: String,

    /// Filesystem-safe derivative of `original_name`
    pub sanitized_name: String,

    /// Bytes written
    pub size: u64,

    /// Absolute location inside the ingestion directory
    pub path: PathBuf,
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while accepting an upload
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("No file part named '{0}' in the upload")]
    MissingFile(&'static str),

    #[error("No file selected")]
    EmptyFilename,

    #[error("Only PDF files are allowed")]
    DisallowedExtension(String),

    #[error("Filename '{0}' does not contain any usable characters")]
    InvalidFilename(String),

    #[error("File exceeds the maximum upload size of {max} bytes")]
    TooLarge { max: u64 },

    #[error("Failed to read upload: {0}")]
    Stream(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl IngestError {
    /// Whether the error is the client's fault (bad upload) rather than ours
    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }

    /// Stable machine-readable code for response bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFile(_) => "MISSING_FILE",
            Self::EmptyFilename => "EMPTY_FILENAME",
            Self::DisallowedExtension(_) => "INVALID_FILE_TYPE",
            Self::InvalidFilename(_) => "INVALID_FILENAME",
            Self::TooLarge { .. } => "FILE_TOO_LARGE",
            Self::Stream(_) => "UPLOAD_READ_FAILED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}
