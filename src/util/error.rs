//! Error types for vesselprep.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for vesselprep operations.
pub type PrepResult<T> = std::result::Result<T, PrepError>;

/// Errors produced by the normalization and mask pipelines.
///
/// Every per-item failure is one of these values; the batch drivers record
/// them instead of aborting.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PrepError {
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Width or height is zero or overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the declared layout.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The template cannot be correlated against.
    #[error("degenerate template: {reason}")]
    DegenerateTemplate { reason: &'static str },
    /// No connected component exceeded the minimum area.
    #[error("no valid bowl region found (area <= {min_area})")]
    NoValidRegion { min_area: f64 },
    /// The dilated mask has zero mass, so no centroid exists.
    #[error("dilated mask has zero area")]
    DegenerateMask,
    /// No candidate encoding produced a parseable record.
    #[error("file could not be decoded with any candidate encoding")]
    UndecodableFile,
    /// Annotation record lacks `info` or a non-zero width/height.
    #[error("missing metadata: {0}")]
    MissingMetadata(&'static str),
    /// Annotation record has a field of the wrong shape.
    #[error("malformed record: {reason}")]
    MalformedRecord { reason: String },
    /// Source file does not exist.
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },
    /// Source file exists but could not be read or decoded.
    #[error("unreadable {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
    /// Output file could not be written.
    #[error("write failed for {}: {reason}", path.display())]
    WriteFailed { path: PathBuf, reason: String },
}
