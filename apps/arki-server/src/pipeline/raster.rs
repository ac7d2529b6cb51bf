//! Page rasterization
//!
//! The flatten strategy only needs "give me every page as pixels, in order".
//! [`Rasterizer`] is that seam; production binds pdfium once at startup and
//! shares the handle across worker threads. pdfium itself is not
//! re-entrant; the `sync` feature of pdfium-render guards every call.

use std::path::Path;

use pdfium_render::prelude::*;

use super::error::PipelineError;
use super::types::PageImage;

/// Callback receiving rendered pages in page order
pub type PageSink<'a> = dyn FnMut(PageImage) -> Result<(), PipelineError> + 'a;

pub trait Rasterizer: Send + Sync {
    /// Render every page of `source` at `dpi` and pass each to `sink`.
    ///
    /// Pages are delivered one at a time so only a single bitmap is held in
    /// memory. An error from `sink` aborts the run and is returned as is.
    /// Returns the number of pages rendered.
    fn rasterize(&self, source: &Path, dpi: u32, sink: &mut PageSink<'_>) -> Result<usize, PipelineError>;
}

/// Rasterizer backed by the pdfium shared library
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Load the pdfium library from an explicit file path
    pub fn bind(library: &Path) -> Result<Self, PipelineError> {
        let bindings = Pdfium::bind_to_library(library)
            .map_err(|e| PipelineError::Engine(format!("{}: {}", library.display(), e)))?;

        tracing::info!(library = %library.display(), "pdfium bound");

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(&self, source: &Path, dpi: u32, sink: &mut PageSink<'_>) -> Result<usize, PipelineError> {
        let document = self
            .pdfium
            .load_pdf_from_file(source, None)
            .map_err(|e| PipelineError::Decode(e.to_string()))?;

        let config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / 72.0)
            .set_clear_color(PdfColor::WHITE);

        let mut rendered = 0;
        for (index, page) in document.pages().iter().enumerate() {
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| PipelineError::Render {
                    page: index + 1,
                    detail: e.to_string(),
                })?;

            sink(PageImage {
                index,
                pixels: bitmap.as_image(),
            })?;
            rendered += 1;
        }

        Ok(rendered)
    }
}
