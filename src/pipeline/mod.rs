//! End-to-end bowl normalization and the failure-tolerant batch driver.
//!
//! `Normalizer` chains the stages for one photograph:
//! gray → locate → crop → segment → grow → recenter. `BatchRunner` feeds it
//! files through a [`FileStore`] and records one outcome per file; no single
//! failure stops the batch.

use crate::center::{recenter, TranslationVector};
use crate::correlate::{Correlator, CorrelatorConfig, MatchResult};
use crate::grow::grow_region;
use crate::image::Image;
use crate::segment::{segment_largest, SegmentConfig};
use crate::store::{FileStore, IMAGE_EXTENSIONS};
use crate::template::Template;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{PrepError, PrepResult};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Calibration and behavior of one normalization pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Intensity cutoff for vessel foreground in the crop.
    pub bowl_threshold: u8,
    /// Radius of the disk used to grow the selected region.
    pub dilation_radius: u8,
    /// Minimum accepted region area in pixels (exclusive).
    pub min_area: f64,
    /// Prefix prepended to the source file name of each output.
    pub output_prefix: String,
    /// Process images of a batch concurrently.
    pub parallel_images: bool,
    pub correlator: CorrelatorConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bowl_threshold: 55,
            dilation_radius: 30,
            min_area: 1_300_000.0,
            output_prefix: "ok_".to_string(),
            parallel_images: false,
            correlator: CorrelatorConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            threshold: self.bowl_threshold,
            min_area: self.min_area,
        }
    }
}

/// Result of normalizing one photograph.
#[derive(Clone, Debug)]
pub struct Normalized {
    /// Centered, background-suppressed crop with the template's size.
    pub image: Image,
    pub location: MatchResult,
    /// Area of the selected region before growth.
    pub region_area: f64,
    pub translation: TranslationVector,
}

/// Template-guided vessel localization and centering.
pub struct Normalizer {
    correlator: Correlator,
    cfg: PipelineConfig,
}

impl Normalizer {
    /// Prepares the correlator for `template`; fails only on a degenerate template.
    pub fn new(template: &Template, cfg: PipelineConfig) -> PrepResult<Self> {
        let correlator = Correlator::new(template, cfg.correlator.clone())?;
        Ok(Self { correlator, cfg })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Runs every stage on one image.
    pub fn normalize(&self, image: &Image) -> PrepResult<Normalized> {
        let _span = trace_span!("normalize", width = image.width(), height = image.height())
            .entered();

        let gray = image.to_gray();
        let location = self.correlator.locate(gray.view()?)?;
        let (tw, th) = (
            self.correlator.template_width(),
            self.correlator.template_height(),
        );

        let crop = image.crop(location.x, location.y, tw, th)?;
        let gray_crop = gray.crop(location.x, location.y, tw, th)?;

        let region = segment_largest(&gray_crop, &self.cfg.segment_config())?;
        let grown = grow_region(tw as u32, th as u32, &region, self.cfg.dilation_radius);
        let centered = recenter(&crop, &grown)?;

        trace_event!(
            "normalized",
            score = location.score,
            area = region.area,
            dx = centered.translation.dx,
            dy = centered.translation.dy
        );
        Ok(Normalized {
            image: centered.image,
            location,
            region_area: region.area,
            translation: centered.translation,
        })
    }
}

/// Successful item of a batch.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemSuccess {
    pub output: PathBuf,
    /// Wall-clock time from decoded input to written output.
    pub elapsed: Duration,
}

/// Outcome for one input file.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemReport {
    pub source: PathBuf,
    pub outcome: PrepResult<ItemSuccess>,
}

/// Per-item outcomes in input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }
}

/// Drives a `Normalizer` over many files.
pub struct BatchRunner<'a, S: FileStore> {
    store: &'a S,
    normalizer: &'a Normalizer,
    output_dir: PathBuf,
}

impl<'a, S: FileStore> BatchRunner<'a, S> {
    pub fn new(store: &'a S, normalizer: &'a Normalizer, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            normalizer,
            output_dir: output_dir.into(),
        }
    }

    /// Output location for a source file: `<output_dir>/<prefix><file name>`.
    pub fn output_path(&self, source: &Path) -> PrepResult<PathBuf> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(PrepError::InvalidInput("source path has no file name"))?;
        Ok(self
            .output_dir
            .join(format!("{}{}", self.normalizer.config().output_prefix, name)))
    }

    /// Processes one file end to end.
    pub fn process(&self, source: &Path) -> PrepResult<ItemSuccess> {
        let image = self.store.read_image(source)?;
        let start = Instant::now();
        let normalized = self.normalizer.normalize(&image)?;
        let output = self.output_path(source)?;
        self.store.write_image(&output, &normalized.image)?;
        Ok(ItemSuccess {
            output,
            elapsed: start.elapsed(),
        })
    }

    fn report(&self, source: &Path) -> ItemReport {
        let outcome = self.process(source);
        if let Err(err) = &outcome {
            let file = source.display().to_string();
            let reason = err.to_string();
            trace_warn!("item_skipped", file = file.as_str(), reason = reason.as_str());
        }
        ItemReport {
            source: source.to_path_buf(),
            outcome,
        }
    }

    /// Processes every source, isolating failures per item.
    pub fn run(&self, sources: &[PathBuf]) -> BatchReport {
        let _span = trace_span!("batch", items = sources.len()).entered();
        let items = if self.normalizer.config().parallel_images {
            sources.par_iter().map(|s| self.report(s)).collect()
        } else {
            sources.iter().map(|s| self.report(s)).collect()
        };
        BatchReport { items }
    }

    /// Lists the photographs in `input_dir` and runs them.
    ///
    /// Only a failure to list the directory is returned as an error.
    pub fn run_dir(&self, input_dir: &Path) -> PrepResult<BatchReport> {
        let sources = self.store.list_files(input_dir, IMAGE_EXTENSIONS)?;
        Ok(self.run(&sources))
    }
}
