//! Artifact storage on the local filesystem
//!
//! One flat directory holds every produced document; see `ArtifactStore`.

mod artifact_store;
mod types;

pub use artifact_store::ArtifactStore;
pub use types::*;
