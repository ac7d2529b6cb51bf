//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::{Pipeline, Rasterizer};
use crate::storage::ArtifactStore;
use crate::upload::IngestionGate;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    gate: IngestionGate,
    pipeline: Pipeline,
}

impl AppState {
    /// Create a new application state around an already bound rasterizer
    pub fn new(config: Config, rasterizer: Arc<dyn Rasterizer>) -> Self {
        let gate = IngestionGate::new(&config.storage.upload_dir, config.storage.max_upload_bytes);
        let store = ArtifactStore::new(&config.storage.processed_dir);
        let pipeline = Pipeline::new(rasterizer, store, &config.storage.scratch_dir, &config.pipeline);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                gate,
                pipeline,
            }),
        }
    }

    /// Create the ingestion and processed directories
    pub async fn prepare(&self) -> std::io::Result<()> {
        self.gate().ensure_dir().await?;
        self.store().ensure_dir().await?;
        tokio::fs::create_dir_all(&self.inner.config.storage.scratch_dir).await
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the ingestion gate
    pub fn gate(&self) -> &IngestionGate {
        &self.inner.gate
    }

    /// Get the artifact store
    pub fn store(&self) -> &ArtifactStore {
        self.inner.pipeline.store()
    }

    /// Get the transformation pipeline
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }
}
