//! Dense ZNCC scans over placement ranges.
//!
//! Window sums are accumulated in integers so the variance term is exact;
//! only the template dot product is floating point.

use crate::image::ImageView;
use crate::template::TemplatePlan;
use crate::util::{PrepError, PrepResult};
use rayon::prelude::*;

/// Best placement found by a scan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Placement {
    pub x: usize,
    pub y: usize,
    pub score: f64,
}

/// Inclusive range of top-left placements.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ScanRange {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl ScanRange {
    /// Every placement where the template fits inside the image.
    pub fn full(image: ImageView<'_, u8>, tpl: &TemplatePlan) -> PrepResult<Self> {
        let (max_x, max_y) = max_placement(image, tpl)?;
        Ok(Self {
            x0: 0,
            y0: 0,
            x1: max_x,
            y1: max_y,
        })
    }

    /// Placements within `radius` of `(cx, cy)`, clamped to the valid range.
    pub fn around(
        image: ImageView<'_, u8>,
        tpl: &TemplatePlan,
        cx: usize,
        cy: usize,
        radius: usize,
    ) -> PrepResult<Self> {
        let (max_x, max_y) = max_placement(image, tpl)?;
        let cx = cx.min(max_x);
        let cy = cy.min(max_y);
        Ok(Self {
            x0: cx.saturating_sub(radius),
            y0: cy.saturating_sub(radius),
            x1: (cx + radius).min(max_x),
            y1: (cy + radius).min(max_y),
        })
    }
}

fn max_placement(image: ImageView<'_, u8>, tpl: &TemplatePlan) -> PrepResult<(usize, usize)> {
    if image.width() < tpl.width() || image.height() < tpl.height() {
        return Err(PrepError::InvalidInput(
            "template exceeds search image dimensions",
        ));
    }
    Ok((image.width() - tpl.width(), image.height() - tpl.height()))
}

/// ZNCC score of the template placed with its top-left corner at `(x, y)`.
///
/// Windows whose per-pixel variance is at most `min_var_i` carry no
/// correlation information and score `0.0`.
pub(crate) fn score_at(
    image: ImageView<'_, u8>,
    tpl: &TemplatePlan,
    x: usize,
    y: usize,
    min_var_i: f64,
) -> f64 {
    let tpl_width = tpl.width();
    let t_prime = tpl.t_prime();

    let mut dot = 0.0f64;
    let mut sum_i = 0u64;
    let mut sum_i2 = 0u64;
    for ty in 0..tpl.height() {
        let img_row = image.row(y + ty).expect("row within bounds for scan");
        let window = &img_row[x..x + tpl_width];
        let base = ty * tpl_width;
        for (tx, &value) in window.iter().enumerate() {
            let v = u64::from(value);
            dot += t_prime[base + tx] * value as f64;
            sum_i += v;
            sum_i2 += v * v;
        }
    }

    let n = (tpl_width * tpl.height()) as u128;
    let scaled_var = n * u128::from(sum_i2) - u128::from(sum_i) * u128::from(sum_i);
    let var_i = scaled_var as f64 / n as f64;
    if var_i / n as f64 <= min_var_i {
        return 0.0;
    }

    let score = dot / (tpl.var_t() * var_i).sqrt();
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

fn best_in_row(
    image: ImageView<'_, u8>,
    tpl: &TemplatePlan,
    y: usize,
    range: ScanRange,
    min_var_i: f64,
) -> Placement {
    let mut best = Placement {
        x: range.x0,
        y,
        score: f64::NEG_INFINITY,
    };
    for x in range.x0..=range.x1 {
        let score = score_at(image, tpl, x, y, min_var_i);
        if score > best.score {
            best = Placement { x, y, score };
        }
    }
    best
}

/// Returns the first maximum in row-major order over `range`.
///
/// The parallel path evaluates rows concurrently but reduces them in row
/// order with the same strict comparison, so both paths agree exactly.
pub(crate) fn scan_best(
    image: ImageView<'_, u8>,
    tpl: &TemplatePlan,
    range: ScanRange,
    min_var_i: f64,
    parallel: bool,
) -> PrepResult<Placement> {
    let (max_x, max_y) = max_placement(image, tpl)?;
    if range.x0 > range.x1 || range.y0 > range.y1 || range.x1 > max_x || range.y1 > max_y {
        return Err(PrepError::InvalidInput("scan range outside valid placements"));
    }

    let rows: Vec<Placement> = if parallel {
        (range.y0..=range.y1)
            .into_par_iter()
            .map(|y| best_in_row(image, tpl, y, range, min_var_i))
            .collect()
    } else {
        (range.y0..=range.y1)
            .map(|y| best_in_row(image, tpl, y, range, min_var_i))
            .collect()
    };

    let mut best = rows[0];
    for row in rows.into_iter().skip(1) {
        if row.score > best.score {
            best = row;
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::{scan_best, score_at, ScanRange};
    use crate::image::ImageView;
    use crate::template::TemplatePlan;

    fn pattern(width: usize, height: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(((x * 17 + y * 9 + x * y) & 0xFF) as u8);
            }
        }
        data
    }

    #[test]
    fn scan_matches_bruteforce() {
        let (img_width, img_height) = (9, 7);
        let image = pattern(img_width, img_height);
        let tpl: Vec<u8> = vec![3, 200, 41, 90, 7, 150];
        let image_view = ImageView::from_slice(&image, img_width, img_height).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 3, 2).unwrap()).unwrap();

        let range = ScanRange::full(image_view, &plan).unwrap();
        let best = scan_best(image_view, &plan, range, 1e-8, false).unwrap();

        let mean = tpl.iter().map(|&v| v as f64).sum::<f64>() / 6.0;
        let mut expected = (0, 0, f64::NEG_INFINITY);
        for y in 0..=(img_height - 2) {
            for x in 0..=(img_width - 3) {
                let mut window = Vec::new();
                for ty in 0..2 {
                    for tx in 0..3 {
                        window.push(image[(y + ty) * img_width + x + tx] as f64);
                    }
                }
                let w_mean = window.iter().sum::<f64>() / 6.0;
                let mut num = 0.0;
                let mut den_t = 0.0;
                let mut den_i = 0.0;
                for (t, i) in tpl.iter().zip(window.iter()) {
                    let dt = *t as f64 - mean;
                    let di = i - w_mean;
                    num += dt * di;
                    den_t += dt * dt;
                    den_i += di * di;
                }
                let score = if den_i > 0.0 { num / (den_t * den_i).sqrt() } else { 0.0 };
                if score > expected.2 {
                    expected = (x, y, score);
                }
            }
        }

        assert_eq!((best.x, best.y), (expected.0, expected.1));
        assert!((best.score - expected.2).abs() < 1e-9);
    }

    #[test]
    fn flat_window_scores_zero() {
        let image = vec![42u8; 16];
        let tpl: Vec<u8> = vec![0, 255, 255, 0];
        let image_view = ImageView::from_slice(&image, 4, 4).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 2, 2).unwrap()).unwrap();
        assert_eq!(score_at(image_view, &plan, 1, 1, 1e-8), 0.0);
    }

    #[test]
    fn parallel_scan_keeps_first_maximum() {
        // Two identical copies of a pattern: the upper-left one must win.
        let (w, h) = (12, 10);
        let tpl: Vec<u8> = vec![10, 200, 60, 120];
        let mut image = vec![0u8; w * h];
        for &(ox, oy) in &[(2usize, 1usize), (7, 6)] {
            for ty in 0..2 {
                for tx in 0..2 {
                    image[(oy + ty) * w + ox + tx] = tpl[ty * 2 + tx];
                }
            }
        }
        let view = ImageView::from_slice(&image, w, h).unwrap();
        let plan = TemplatePlan::from_view(ImageView::from_slice(&tpl, 2, 2).unwrap()).unwrap();
        let range = ScanRange::full(view, &plan).unwrap();

        let seq = scan_best(view, &plan, range, 1e-8, false).unwrap();
        let par = scan_best(view, &plan, range, 1e-8, true).unwrap();
        assert_eq!((seq.x, seq.y), (2, 1));
        assert_eq!(seq, par);
    }
}
