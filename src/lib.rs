//! vesselprep prepares photographs of circular vessels for unsupervised
//! learning.
//!
//! The normalization pipeline locates the vessel with a ZNCC template match,
//! crops it, segments it by intensity threshold and area, grows the region
//! with a disk dilation, and re-centers the background-suppressed crop on the
//! region centroid. A second pipeline rasterizes polygon annotation records
//! into binary masks on a bounded worker pool.
//!
//! File access goes through the [`FileStore`] trait; the `image-io` feature
//! provides a disk-backed [`FsStore`](store::FsStore).

pub mod annotation;
pub mod center;
pub mod correlate;
pub mod grow;
pub mod image;
pub mod pipeline;
pub mod pool;
pub mod raster;
pub mod segment;
pub mod store;
pub mod template;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use crate::image::io;

pub use crate::image::{Image, ImageView};
pub use annotation::{AnnotationObject, AnnotationRecord, MaskConfig, MaskRasterizer};
pub use center::{Recentered, TranslationVector};
pub use correlate::{Correlator, CorrelatorConfig, MatchResult};
pub use pipeline::{
    BatchReport, BatchRunner, ItemReport, ItemSuccess, Normalized, Normalizer, PipelineConfig,
};
pub use pool::{PoolSummary, WorkerPool};
pub use segment::{Region, SegmentConfig};
pub use store::FileStore;
pub use template::Template;
pub use util::{PrepError, PrepResult};

/// Single-channel 0/255 mask.
pub type BinaryMask = ::image::GrayImage;
