//! Even-odd scanline polygon fill.
//!
//! A pixel `(x, y)` is filled when its center `(x, y)` lies inside the
//! polygon under the even-odd rule. Along each row the filled span between a
//! pair of edge crossings `a <= b` is half-open, `a <= x < b`, so polygons
//! that share an edge never both claim the pixels on it.

use crate::util::math::is_closed;
use crate::BinaryMask;
use image::Luma;

/// Returns the polygon with its first vertex appended when it is not closed.
pub fn close_polygon(vertices: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut closed = vertices.to_vec();
    if !is_closed(vertices) {
        closed.push(vertices[0]);
    }
    closed
}

/// Fills a closed polygon into `canvas` with `value`, clipping to its bounds.
///
/// `closed` must repeat its first vertex at the end (see [`close_polygon`]).
/// Fewer than three vertices is degenerate and fills nothing. Pixels are only
/// ever set, so repeated calls OR-combine.
pub fn fill_polygon(canvas: &mut BinaryMask, closed: &[[f64; 2]], value: u8) {
    if closed.len() < 3 {
        return;
    }
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let (min_y, max_y) = closed
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v[1]), hi.max(v[1]))
        });
    if !min_y.is_finite() || !max_y.is_finite() {
        return;
    }
    let row_start = min_y.ceil().max(0.0) as u32;
    let row_end = max_y.floor().min(f64::from(height - 1));
    if row_end < 0.0 {
        return;
    }
    let row_end = row_end as u32;

    let mut crossings: Vec<f64> = Vec::new();
    for y in row_start..=row_end {
        let yc = f64::from(y);
        crossings.clear();
        for edge in closed.windows(2) {
            let ([x0, y0], [x1, y1]) = (edge[0], edge[1]);
            if (y0 <= yc) != (y1 <= yc) {
                crossings.push(x0 + (yc - y0) * (x1 - x0) / (y1 - y0));
            }
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            let start = span[0].ceil().max(0.0);
            let end = span[1].ceil().min(f64::from(width));
            if start >= end {
                continue;
            }
            for x in start as u32..end as u32 {
                canvas.put_pixel(x, y, Luma([value]));
            }
        }
    }
}
