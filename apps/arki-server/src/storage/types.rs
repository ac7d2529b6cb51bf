//! Artifact store types

use std::path::PathBuf;

use thiserror::Error;

/// A transformed document published for download
#[derive(Debug, Clone)]
pub struct OutputArtifact {
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// A published artifact read back for download
#[derive(Debug)]
pub struct StoredArtifact {
    /// Suggested download name (same as the lookup name)
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
