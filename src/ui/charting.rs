/// Axis bounds for plotting a route as (lng, lat) pairs.
///
/// Pads the box by 10% (at least `min_span` degrees overall) so a single
/// point or a straight line still gets a visible frame.
pub fn compute_route_bounds(coords: &[(f64, f64)], min_span: f64) -> ([f64; 2], [f64; 2]) {
    let Some(&(x0, y0)) = coords.first() else {
        return ([-min_span, min_span], [-min_span, min_span]);
    };

    let (mut min_x, mut max_x, mut min_y, mut max_y) = (x0, x0, y0, y0);
    for &(x, y) in coords {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    (pad(min_x, max_x, min_span), pad(min_y, max_y, min_span))
}

fn pad(lo: f64, hi: f64, min_span: f64) -> [f64; 2] {
    let span = (hi - lo).max(min_span);
    let mid = (lo + hi) / 2.0;
    let half = span * 1.1 / 2.0;
    [mid - half, mid + half]
}

/// Coordinate label with enough precision to tell ticks apart
pub fn format_coord(val: f64) -> String {
    format!("{val:.4}")
}
