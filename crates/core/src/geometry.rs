//! Pure geometry over pixel-space point sequences
//!
//! Nothing here holds state. Lengths come back in pixels, areas in square
//! pixels; the `to_real_*` helpers project them through a [`Scale`].

use crate::error::{MeasureError, MeasureResult};
use crate::scale::Scale;

/// A point in canvas pixel space
///
/// - Origin (0, 0) at the top-left of the image or canvas
/// - X increases to the right, Y increases downward
/// - Independent of the current zoom factor
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        distance(*self, *other)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Euclidean distance between two points, in pixels
pub fn distance(p1: Point, p2: Point) -> f64 {
    let dx = p1.x - p2.x;
    let dy = p1.y - p2.y;
    dx.hypot(dy)
}

/// Length of an open chain: sum of consecutive segment lengths
///
/// Returns 0 for fewer than two points.
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// Area of the closed polygon through `points` (shoelace formula)
///
/// The loop is closed implicitly from the last point back to the first, so
/// callers never repeat the starting vertex. Returns 0 for fewer than three
/// points.
pub fn polygon_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }

    let mut twice_area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x * points[j].y;
        twice_area -= points[j].x * points[i].y;
    }
    (twice_area / 2.0).abs()
}

/// Project a pixel length into real units
///
/// Falls back to the raw pixel value when the scale is uncalibrated. Check
/// [`Scale::is_calibrated`] (or use [`try_to_real_units`]) before presenting
/// the result as a real-world length.
pub fn to_real_units(pixels: f64, scale: &Scale) -> f64 {
    if scale.is_calibrated() {
        pixels / scale.pixels_per_unit()
    } else {
        pixels
    }
}

/// Project a square-pixel area into square real units
///
/// Same uncalibrated fallback as [`to_real_units`].
pub fn to_real_area(square_pixels: f64, scale: &Scale) -> f64 {
    if scale.is_calibrated() {
        let ppu = scale.pixels_per_unit();
        square_pixels / (ppu * ppu)
    } else {
        square_pixels
    }
}

/// Like [`to_real_units`], but reports a missing scale instead of falling back
pub fn try_to_real_units(pixels: f64, scale: &Scale) -> MeasureResult<f64> {
    if scale.is_calibrated() {
        Ok(to_real_units(pixels, scale))
    } else {
        Err(MeasureError::Uncalibrated)
    }
}

/// Format a value for display, rounded to two decimals
pub fn format_value(value: f64, unit_suffix: &str) -> String {
    format!("{:.2} {}", value, unit_suffix)
}

/// Index of the vertex nearest to `target` together with its distance
pub fn nearest_vertex(points: &[Point], target: Point) -> Option<(usize, f64)> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, distance(*p, target)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}
