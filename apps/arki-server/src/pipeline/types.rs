//! Pipeline types

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use image::DynamicImage;

use super::error::PipelineError;
use crate::storage::OutputArtifact;

// ============================================================================
// Strategy
// ============================================================================

/// Which transformation to apply to an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Rasterize every page and rebuild the document from the images
    #[default]
    Flatten,
    /// Copy pages into a new document and lock it down with permissions
    Restrict,
}

impl Strategy {
    /// Parse the `mode` field of an upload request
    pub fn from_mode(mode: &str) -> Option<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "flatten" | "flat" => Some(Self::Flatten),
            "protect" | "restrict" => Some(Self::Restrict),
            _ => None,
        }
    }

    /// Name used in the `mode` request field and in responses
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::Flatten => "flatten",
            Self::Restrict => "protect",
        }
    }

    /// Prefix put in front of the sanitized source name. Must stay within
    /// [`OUTPUT_PREFIX_RESERVE`](crate::upload::OUTPUT_PREFIX_RESERVE).
    pub fn output_prefix(&self) -> &'static str {
        match self {
            Self::Flatten => "flattened_",
            Self::Restrict => "protected_",
        }
    }

    pub fn output_name(&self, sanitized_name: &str) -> String {
        format!("{}{}", self.output_prefix(), sanitized_name)
    }
}

// ============================================================================
// Page Image
// ============================================================================

/// One rasterized page, delivered by a [`Rasterizer`](super::Rasterizer)
pub struct PageImage {
    /// Zero-based page index in the source document
    pub index: usize,
    pub pixels: DynamicImage,
}

impl PageImage {
    /// Encoding used for intermediates on disk
    pub const FORMAT: image::ImageFormat = image::ImageFormat::Png;

    /// Scratch file name, zero-padded so lexical order is page order
    pub fn file_name(&self) -> String {
        intermediate_name(self.index)
    }
}

pub(crate) fn intermediate_name(index: usize) -> String {
    format!("page_{:05}.png", index)
}

// ============================================================================
// Results
// ============================================================================

/// What a strategy produced, before the runner adds timing
#[derive(Debug)]
pub struct Transformed {
    pub artifact: OutputArtifact,
    pub pages: usize,
}

/// A successful pipeline run
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub strategy: Strategy,
    pub artifact: OutputArtifact,
    pub pages: usize,
    /// Rasterization resolution, only for flatten
    pub dpi: Option<u32>,
    pub elapsed_ms: u64,
}

// ============================================================================
// Cancellation
// ============================================================================

const RUNNING: u8 = 0;
const CANCELLED: u8 = 1;
const COMMITTED: u8 = 2;

/// Shared run state between the runner and the blocking worker.
///
/// A run ends either cancelled (the runner gave up on it) or committed (the
/// worker is about to publish). Exactly one side wins the transition, so a
/// cancelled run never publishes and a committed run is never reported as
/// timed out.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicU8>);

impl CancelFlag {
    /// Flag the run as cancelled. Returns `false` if the worker already
    /// committed its output.
    pub fn cancel(&self) -> bool {
        self.transition(CANCELLED)
    }

    /// Claim the right to publish. Fails if the run was cancelled first.
    pub fn commit(&self) -> Result<(), PipelineError> {
        if self.transition(COMMITTED) {
            Ok(())
        } else {
            Err(PipelineError::Cancelled)
        }
    }

    fn transition(&self, to: u8) -> bool {
        self.0
            .compare_exchange(RUNNING, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst) == CANCELLED
    }

    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }
}
