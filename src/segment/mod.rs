//! Threshold segmentation and largest-region selection.
//!
//! Only exterior boundaries are extracted: holes inside a region and islands
//! inside those holes never become separate candidates.

use crate::image::Image;
use crate::trace::{trace_event, trace_span};
use crate::util::math::polygon_area;
use crate::util::{PrepError, PrepResult};
use crate::BinaryMask;
use image::Luma;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;

/// Calibration for region selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentConfig {
    /// Intensities strictly above this value are foreground.
    pub threshold: u8,
    /// Regions must enclose strictly more than this area, in pixels.
    pub min_area: f64,
}

/// Connected foreground component described by its outer boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    /// Boundary pixel centers in tracing order; the polygon is implicitly closed.
    pub points: Vec<Point<i32>>,
    /// Shoelace area enclosed by `points`.
    pub area: f64,
}

impl Region {
    /// Builds a region from boundary points, computing its area.
    pub fn from_points(points: Vec<Point<i32>>) -> Self {
        let coords: Vec<(f64, f64)> = points
            .iter()
            .map(|p| (f64::from(p.x), f64::from(p.y)))
            .collect();
        let area = polygon_area(&coords);
        Self { points, area }
    }
}

/// Binarizes a single-channel image: `> threshold` becomes 255, the rest 0.
pub fn threshold(gray: &Image, threshold: u8) -> PrepResult<BinaryMask> {
    if gray.channels() != 1 {
        return Err(PrepError::InvalidInput("threshold needs a single-channel image"));
    }
    let (w, h) = (gray.width() as u32, gray.height() as u32);
    let data = gray.data();
    Ok(BinaryMask::from_fn(w, h, |x, y| {
        let value = data[y as usize * gray.width() + x as usize];
        Luma([if value > threshold { 255 } else { 0 }])
    }))
}

/// Extracts the outermost boundary of every foreground component.
pub fn find_regions(mask: &BinaryMask) -> Vec<Region> {
    find_contours::<i32>(mask)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Region::from_points(c.points))
        .collect()
}

/// Picks the largest region whose area exceeds `min_area`.
///
/// Regions are compared with strict `>` in discovery order, so of several
/// regions sharing the maximal area the first one found is kept.
pub fn select_largest(regions: Vec<Region>, min_area: f64) -> Option<Region> {
    let mut best: Option<Region> = None;
    let mut max_area = 0.0f64;
    for region in regions {
        if region.area > min_area && region.area > max_area {
            max_area = region.area;
            best = Some(region);
        }
    }
    best
}

/// Thresholds the crop and returns its largest qualifying region.
pub fn segment_largest(gray_crop: &Image, cfg: &SegmentConfig) -> PrepResult<Region> {
    let _span = trace_span!("segment", threshold = cfg.threshold).entered();

    let mask = threshold(gray_crop, cfg.threshold)?;
    let regions = find_regions(&mask);
    trace_event!("regions", count = regions.len());

    select_largest(regions, cfg.min_area).ok_or(PrepError::NoValidRegion {
        min_area: cfg.min_area,
    })
}
