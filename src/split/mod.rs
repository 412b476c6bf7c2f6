// src/split/mod.rs
// Segment Splitter - external split tool contract

mod ffmpeg;

pub use ffmpeg::{FfmpegSplitter, SplitMode};

use crate::plan::SplitPlan;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("Split tool failed: {0}")]
    ToolFailed(String),

    #[error("Segment {index} missing after split")]
    MissingSegment { index: usize },

    #[error("Duration probe failed: {0}")]
    Probe(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cuts a source recording into segment files.
///
/// Implementations must name the output so that lexical sort order equals
/// temporal order; everything downstream relies on that.
#[async_trait]
pub trait SegmentSplitter: Send + Sync {
    /// Produce one file per segment of `plan`, in segment order. Partial
    /// output is never returned: if any expected segment is missing the
    /// whole operation fails and leftovers are removed.
    async fn split(&self, source: &Path, plan: &SplitPlan) -> Result<Vec<PathBuf>, SplitError>;

    /// Measure the real duration of a media file in seconds.
    async fn probe_duration(&self, source: &Path) -> Result<f64, SplitError>;
}
