//! Artifact Store
//!
//! Flat directory of produced documents. Outputs are staged in a hidden
//! temporary file inside the same directory and renamed into place, so a
//! name only ever resolves to a complete document.
//!
//! Lookup is by filename alone; anyone who knows a name can fetch it.

use std::io;
use std::path::{Component, Path, PathBuf};

use tempfile::NamedTempFile;

use super::types::{OutputArtifact, StoreError, StoredArtifact};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the processed directory if missing. Safe to call repeatedly.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Open a staging file for an output that is not yet complete.
    ///
    /// Blocking; called from pipeline worker threads.
    pub fn stage(&self) -> io::Result<NamedTempFile> {
        std::fs::create_dir_all(&self.dir)?;
        tempfile::Builder::new()
            .prefix(".staging-")
            .suffix(".pdf")
            .tempfile_in(&self.dir)
    }

    /// Atomically move a finished staging file to `file_name`, replacing any
    /// earlier artifact of the same name.
    pub fn publish(&self, staged: NamedTempFile, file_name: &str) -> Result<OutputArtifact, StoreError> {
        let path = self.resolve(file_name)?;
        staged.as_file().sync_all()?;
        staged.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        let size = std::fs::metadata(&path)?.len();
        tracing::debug!(file_name = %file_name, size, "Artifact published");

        Ok(OutputArtifact {
            file_name: file_name.to_string(),
            path,
            size,
        })
    }

    /// Read a published artifact
    pub async fn open(&self, file_name: &str) -> Result<StoredArtifact, StoreError> {
        let path = self.resolve(file_name)?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(file_name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        if !metadata.is_file() {
            return Err(StoreError::NotFound(file_name.to_string()));
        }

        let data = tokio::fs::read(&path).await?;

        Ok(StoredArtifact {
            file_name: file_name.to_string(),
            data,
        })
    }

    /// Map a name to a path directly inside the store.
    ///
    /// Anything that is not a single plain component (separators, `..`,
    /// absolute paths, NUL, hidden staging names) cannot name an artifact.
    fn resolve(&self, file_name: &str) -> Result<PathBuf, StoreError> {
        let not_found = || StoreError::NotFound(file_name.to_string());

        if file_name.is_empty()
            || file_name.starts_with('.')
            || file_name.contains(['/', '\\', '\0'])
        {
            return Err(not_found());
        }

        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.dir.join(file_name)),
            _ => Err(not_found()),
        }
    }
}
