//! Flatten strategy
//!
//! Rasterize every page, then rebuild the document from the page images so
//! no text, vector, form or annotation content survives.
//!
//! Each run gets its own scratch directory under the configured scratch
//! root. Intermediates never outlive the run, whatever the outcome.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::assemble::write_image_pdf;
use super::error::PipelineError;
use super::raster::Rasterizer;
use super::types::{CancelFlag, PageImage, Transformed};
use crate::storage::ArtifactStore;

/// Inputs of one flatten run
pub struct FlattenJob<'a> {
    pub source: &'a Path,
    pub output_name: &'a str,
    pub dpi: u32,
}

/// Run the flatten strategy to completion.
///
/// Blocking; call from `spawn_blocking`.
pub fn flatten(
    rasterizer: &dyn Rasterizer,
    store: &ArtifactStore,
    scratch_root: &Path,
    job: &FlattenJob<'_>,
    cancel: &CancelFlag,
) -> Result<Transformed, PipelineError> {
    std::fs::create_dir_all(scratch_root)?;
    let scratch = tempfile::Builder::new()
        .prefix("arki-flatten-")
        .tempdir_in(scratch_root)?;
    let scratch_path = scratch.path().to_path_buf();

    tracing::debug!(scratch = %scratch_path.display(), source = %job.source.display(), "Flatten started");

    let result = flatten_in(rasterizer, store, &scratch_path, job, cancel);

    // Cleanup problems are logged; the run's own result wins
    if let Err(e) = scratch.close() {
        tracing::warn!(scratch = %scratch_path.display(), error = %e, "Failed to remove scratch directory");
    }

    result
}

fn flatten_in(
    rasterizer: &dyn Rasterizer,
    store: &ArtifactStore,
    scratch: &Path,
    job: &FlattenJob<'_>,
    cancel: &CancelFlag,
) -> Result<Transformed, PipelineError> {
    let mut intermediates: Vec<(usize, PathBuf)> = Vec::new();

    let mut persist_page = |page: PageImage| -> Result<(), PipelineError> {
        cancel.check()?;

        let path = scratch.join(page.file_name());
        page.pixels
            .save_with_format(&path, PageImage::FORMAT)
            .map_err(|e| PipelineError::Image(format!("page {}: {}", page.index + 1, e)))?;

        tracing::trace!(
            page = page.index + 1,
            width = page.pixels.width(),
            height = page.pixels.height(),
            "Page rasterized"
        );
        intermediates.push((page.index, path));
        Ok(())
    };
    rasterizer.rasterize(job.source, job.dpi, &mut persist_page)?;

    if intermediates.is_empty() {
        return Err(PipelineError::NoPages);
    }
    intermediates.sort_by_key(|(index, _)| *index);
    let ordered: Vec<PathBuf> = intermediates.into_iter().map(|(_, path)| path).collect();

    cancel.check()?;

    let staged = store.stage()?;
    let pages = {
        let mut writer = BufWriter::new(staged.as_file());
        let pages = write_image_pdf(&ordered, job.dpi, &mut writer)?;
        writer.flush()?;
        pages
    };

    // Past this point the runner can no longer cancel the run
    cancel.commit()?;

    let artifact = store.publish(staged, job.output_name)?;

    Ok(Transformed { artifact, pages })
}
