//! Geometry helpers for region measurements.

/// Absolute shoelace area of a closed polygon given by its vertices.
///
/// The closing edge from the last vertex back to the first is implied.
/// Fewer than three vertices enclose no area.
pub(crate) fn polygon_area(points: &[(f64, f64)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0f64;
    for (i, &(x0, y0)) in points.iter().enumerate() {
        let (x1, y1) = points[(i + 1) % points.len()];
        twice += x0 * y1 - x1 * y0;
    }
    twice.abs() * 0.5
}

/// Returns `true` when a polygon's first and last vertices coincide.
pub(crate) fn is_closed(points: &[[f64; 2]]) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => first == last,
        _ => true,
    }
}
