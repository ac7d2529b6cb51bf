//! Pipeline runner
//!
//! Async front of the transformation strategies. Each run is pushed onto the
//! blocking pool and bounded by the configured timeout. On timeout the run is
//! flagged as cancelled so the worker stops between pages and never
//! publishes. If the worker committed its output first, the runner waits
//! for the publish to finish and reports success instead.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::time::{timeout, Duration};

use super::error::PipelineError;
use super::flatten::{flatten, FlattenJob};
use super::raster::Rasterizer;
use super::restrict::{restrict, RestrictJob};
use super::types::{CancelFlag, Strategy, TransformOutcome};
use crate::config::PipelineConfig;
use crate::storage::ArtifactStore;
use crate::upload::SourceArtifact;

/// Shared handle for running transformations
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

#[derive(Clone)]
struct PipelineInner {
    rasterizer: Arc<dyn Rasterizer>,
    store: ArtifactStore,
    scratch_dir: PathBuf,
    dpi: u32,
    owner_password: String,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        store: ArtifactStore,
        scratch_dir: impl Into<PathBuf>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                rasterizer,
                store,
                scratch_dir: scratch_dir.into(),
                dpi: config.flatten_dpi,
                owner_password: config.owner_password.clone(),
                timeout: Duration::from_secs(config.timeout_secs),
            }),
        }
    }

    /// Override the run timeout
    pub fn with_timeout(self, limit: Duration) -> Self {
        let mut inner = Arc::unwrap_or_clone(self.inner);
        inner.timeout = limit;
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Rasterization resolution used by flatten
    pub fn dpi(&self) -> u32 {
        self.inner.dpi
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.inner.store
    }

    /// Transform `source` with `strategy` and publish the result.
    pub async fn run(&self, strategy: Strategy, source: &SourceArtifact) -> Result<TransformOutcome, PipelineError> {
        let output_name = strategy.output_name(&source.sanitized_name);
        let cancel = CancelFlag::default();
        let started = Instant::now();

        tracing::info!(
            strategy = ?strategy,
            source = %source.sanitized_name,
            output = %output_name,
            "Pipeline run started"
        );

        let inner = self.inner.clone();
        let source_path = source.path.clone();
        let worker_cancel = cancel.clone();
        let worker_output = output_name.clone();
        let mut task = tokio::task::spawn_blocking(move || match strategy {
            Strategy::Flatten => {
                let job = FlattenJob {
                    source: &source_path,
                    output_name: &worker_output,
                    dpi: inner.dpi,
                };
                flatten(
                    inner.rasterizer.as_ref(),
                    &inner.store,
                    &inner.scratch_dir,
                    &job,
                    &worker_cancel,
                )
            }
            Strategy::Restrict => {
                let job = RestrictJob {
                    source: &source_path,
                    output_name: &worker_output,
                    owner_password: &inner.owner_password,
                };
                restrict(&inner.store, &job, &worker_cancel)
            }
        });

        let limit = self.inner.timeout;
        let result = match timeout(limit, &mut task).await {
            Ok(join_result) => join_result.unwrap_or_else(|e| Err(PipelineError::Join(e.to_string()))),
            Err(_) if cancel.cancel() => Err(PipelineError::Timeout(limit.as_secs())),
            Err(_) => {
                tracing::debug!(output = %output_name, "Run committed before timeout, awaiting publish");
                task.await
                    .unwrap_or_else(|e| Err(PipelineError::Join(e.to_string())))
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(transformed) => {
                tracing::info!(
                    strategy = ?strategy,
                    output = %transformed.artifact.file_name,
                    pages = transformed.pages,
                    size = transformed.artifact.size,
                    elapsed_ms,
                    "Pipeline run finished"
                );
                Ok(TransformOutcome {
                    strategy,
                    artifact: transformed.artifact,
                    pages: transformed.pages,
                    dpi: match strategy {
                        Strategy::Flatten => Some(self.inner.dpi),
                        Strategy::Restrict => None,
                    },
                    elapsed_ms,
                })
            }
            Err(e) => {
                tracing::error!(
                    strategy = ?strategy,
                    source = %source.sanitized_name,
                    error = %e,
                    elapsed_ms,
                    "Pipeline run failed"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::test_support::{entries, write_text_pdf, FakeRasterizer};
    use tempfile::TempDir;

    struct Fixture {
        root: TempDir,
        pipeline: Pipeline,
    }

    impl Fixture {
        fn new(rasterizer: FakeRasterizer) -> Self {
            let root = TempDir::new().unwrap();
            let pipeline = Pipeline::new(
                Arc::new(rasterizer),
                ArtifactStore::new(root.path().join("processed")),
                root.path().join("scratch"),
                &Config::default().pipeline,
            );
            Self { root, pipeline }
        }

        fn source(&self, name: &str, lines: &[&str]) -> SourceArtifact {
            let uploads = self.root.path().join("uploads");
            std::fs::create_dir_all(&uploads).unwrap();
            let path = uploads.join(name);
            write_text_pdf(&path, lines);
            SourceArtifact {
                original_name: name.to_string(),
                sanitized_name: name.to_string(),
                size: std::fs::metadata(&path).unwrap().len(),
                path,
            }
        }
    }

    #[tokio::test]
    async fn test_flatten_outcome_reports_dpi() {
        let fx = Fixture::new(FakeRasterizer::default());
        let source = fx.source("report.pdf", &["a", "b"]);

        let outcome = fx.pipeline.run(Strategy::Flatten, &source).await.unwrap();

        assert_eq!(outcome.strategy, Strategy::Flatten);
        assert_eq!(outcome.artifact.file_name, "flattened_report.pdf");
        assert_eq!(outcome.pages, 2);
        assert_eq!(outcome.dpi, Some(fx.pipeline.dpi()));
        assert!(outcome.artifact.path.is_file());
    }

    #[tokio::test]
    async fn test_restrict_outcome_has_no_dpi() {
        let fx = Fixture::new(FakeRasterizer::default());
        let source = fx.source("report.pdf", &["a"]);

        let outcome = fx.pipeline.run(Strategy::Restrict, &source).await.unwrap();

        assert_eq!(outcome.artifact.file_name, "protected_report.pdf");
        assert_eq!(outcome.pages, 1);
        assert_eq!(outcome.dpi, None);
    }

    #[tokio::test]
    async fn test_timeout_cancels_and_publishes_nothing() {
        let fx = Fixture::new(FakeRasterizer {
            page_delay: Some(std::time::Duration::from_millis(300)),
            ..FakeRasterizer::default()
        });
        let pipeline = fx.pipeline.clone().with_timeout(Duration::from_millis(100));
        let source = fx.source("slow.pdf", &["a", "b", "c", "d", "e"]);

        let result = pipeline.run(Strategy::Flatten, &source).await;
        assert!(matches!(result, Err(PipelineError::Timeout(_))));

        // Let the worker notice the flag and unwind
        tokio::time::sleep(Duration::from_millis(900)).await;

        assert!(entries(fx.pipeline.store().dir()).is_empty());
        assert!(entries(&fx.root.path().join("scratch")).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_runs_use_separate_outputs() {
        let fx = Fixture::new(FakeRasterizer::default());
        let sources: Vec<SourceArtifact> = (0..4)
            .map(|i| fx.source(&format!("doc{}.pdf", i), &["x", "y", "z"]))
            .collect();

        let runs = sources
            .iter()
            .map(|source| fx.pipeline.run(Strategy::Flatten, source));
        let outcomes = futures::future::join_all(runs).await;

        let mut names: Vec<String> = outcomes
            .into_iter()
            .map(|o| o.unwrap().artifact.file_name)
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["flattened_doc0.pdf", "flattened_doc1.pdf", "flattened_doc2.pdf", "flattened_doc3.pdf"]
        );
        assert!(entries(&fx.root.path().join("scratch")).is_empty());
    }
}
