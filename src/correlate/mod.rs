//! Template localization by zero-mean normalized cross-correlation.
//!
//! The score is invariant to affine intensity changes of either the template
//! or the window, so lighting differences between photographs do not bias
//! the location. With a single pyramid level the search is exhaustive over
//! every placement; with more levels the coarsest level is scanned in full
//! and each finer level refines around the upsampled winner.

pub(crate) mod scan;

use crate::image::pyramid::ImagePyramid;
use crate::image::ImageView;
use crate::template::{Template, TemplatePlan};
use crate::trace::{trace_event, trace_span};
use crate::util::{PrepError, PrepResult};
use scan::{scan_best, ScanRange};

/// Smallest template side kept on a coarse pyramid level.
const MIN_LEVEL_SIDE: usize = 4;

/// Correlator tuning.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelatorConfig {
    /// Pyramid levels; `1` scans every placement at full resolution.
    ///
    /// The exhaustive scan costs about `W * H * w * h` multiply-adds for a
    /// `W x H` image and a `w x h` template, which is on the order of `1e12`
    /// for full-resolution photographs with a template of about 1300 px per
    /// side. Use 3 or more levels for such inputs; each extra level cuts the
    /// full scan by roughly 16x.
    pub pyramid_levels: usize,
    /// Search radius in placements around the upsampled coarse winner.
    pub refine_radius: usize,
    /// Per-pixel window variance at or below which a placement scores `0.0`.
    pub min_var_i: f64,
    /// Evaluate rows concurrently.
    pub parallel: bool,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            pyramid_levels: 1,
            refine_radius: 2,
            min_var_i: 1e-8,
            parallel: false,
        }
    }
}

/// Best template placement in a search image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    /// Column of the template's top-left corner.
    pub x: usize,
    /// Row of the template's top-left corner.
    pub y: usize,
    /// ZNCC score in `[-1, 1]`.
    pub score: f64,
}

/// Precomputed template plans for repeated localization.
///
/// A correlator holds no mutable state and can be shared across threads.
pub struct Correlator {
    plans: Vec<TemplatePlan>,
    cfg: CorrelatorConfig,
}

impl Correlator {
    /// Builds plans for every usable pyramid level of the template.
    ///
    /// Fails with `DegenerateTemplate` when the full-resolution template has
    /// no intensity variance. Coarse levels that become too small or flat are
    /// dropped.
    pub fn new(template: &Template, cfg: CorrelatorConfig) -> PrepResult<Self> {
        let base = TemplatePlan::from_view(template.view())?;
        let mut plans = vec![base];

        if cfg.pyramid_levels > 1 {
            let pyramid = ImagePyramid::build_u8(template.view(), cfg.pyramid_levels)?;
            for level in pyramid.levels().iter().skip(1) {
                if level.width() < MIN_LEVEL_SIDE || level.height() < MIN_LEVEL_SIDE {
                    break;
                }
                match TemplatePlan::from_view(level.view()?) {
                    Ok(plan) => plans.push(plan),
                    Err(PrepError::DegenerateTemplate { .. }) => break,
                    Err(err) => return Err(err),
                }
            }
        }

        Ok(Self { plans, cfg })
    }

    /// Number of pyramid levels actually used.
    pub fn num_levels(&self) -> usize {
        self.plans.len()
    }

    /// Template width at full resolution.
    pub fn template_width(&self) -> usize {
        self.plans[0].width()
    }

    /// Template height at full resolution.
    pub fn template_height(&self) -> usize {
        self.plans[0].height()
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.cfg
    }

    /// Locates the template in a grayscale search image.
    ///
    /// Fails with `InvalidInput` when the template is wider or taller than the
    /// image. On exact score ties the first placement in row-major order wins.
    pub fn locate(&self, image: ImageView<'_, u8>) -> PrepResult<MatchResult> {
        let _span = trace_span!(
            "locate",
            width = image.width(),
            height = image.height(),
            levels = self.plans.len()
        )
        .entered();

        let base = &self.plans[0];
        if image.width() < base.width() || image.height() < base.height() {
            return Err(PrepError::InvalidInput(
                "template exceeds search image dimensions",
            ));
        }

        let min_var_i = self.cfg.min_var_i;
        let parallel = self.cfg.parallel;
        if self.plans.len() == 1 {
            let range = ScanRange::full(image, base)?;
            let best = scan_best(image, base, range, min_var_i, parallel)?;
            trace_event!("match", x = best.x, y = best.y, score = best.score);
            return Ok(MatchResult {
                x: best.x,
                y: best.y,
                score: best.score,
            });
        }

        let pyramid = ImagePyramid::build_u8(image, self.plans.len())?;
        let levels = self.plans.len().min(pyramid.levels().len());
        let coarsest = levels - 1;

        let coarse_view = pyramid.levels()[coarsest].view()?;
        let coarse_plan = &self.plans[coarsest];
        let range = ScanRange::full(coarse_view, coarse_plan)?;
        let mut best = scan_best(coarse_view, coarse_plan, range, min_var_i, parallel)?;
        trace_event!("coarse_match", level = coarsest, x = best.x, y = best.y);

        let radius = self.cfg.refine_radius.max(1);
        for level in (0..coarsest).rev() {
            let view = pyramid.levels()[level].view()?;
            let plan = &self.plans[level];
            let range = ScanRange::around(view, plan, best.x * 2, best.y * 2, radius)?;
            best = scan_best(view, plan, range, min_var_i, parallel)?;
        }

        trace_event!("match", x = best.x, y = best.y, score = best.score);
        Ok(MatchResult {
            x: best.x,
            y: best.y,
            score: best.score,
        })
    }
}
