//! Transformation pipeline
//!
//! Two strategies turn an accepted upload into a published artifact:
//!
//! - **Flatten**: rasterize every page at a fixed DPI and rebuild the
//!   document from the images.
//! - **Restrict**: copy the pages into a new document and encrypt it with an
//!   empty user password and a permission mask.
//!
//! Both are CPU-bound and run on the blocking pool via [`Pipeline::run`].

pub mod assemble;
pub mod error;
pub mod flatten;
pub mod raster;
pub mod restrict;
pub mod runner;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::PipelineError;
pub use raster::{PageSink, PdfiumRasterizer, Rasterizer};
pub use runner::Pipeline;
pub use types::*;
