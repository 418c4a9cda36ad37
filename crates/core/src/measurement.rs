//! Committed measurements and freehand strokes
//!
//! All geometry is stored in canvas pixel space. The real-unit value is
//! always derived from the points and the scale in force; there is no
//! setter for it.

use crate::error::{MeasureError, MeasureResult};
use crate::geometry::{
    format_value, polygon_area, polyline_length, to_real_area, to_real_units, Point,
};
use crate::scale::Scale;

/// Unique identifier for measurements
pub type MeasurementId = uuid::Uuid;

/// Unique identifier for freehand strokes
pub type StrokeId = uuid::Uuid;

/// What a finished measurement quantifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MeasurementKind {
    /// Length along an open chain
    Linear,
    /// Enclosed area of the closed chain
    Area,
}

impl MeasurementKind {
    /// Pick the kind for a chain of `point_count` points under `intent`
    ///
    /// Area needs an area-capable intent and at least three points; anything
    /// else is measured as a length.
    pub fn classify(intent: MeasureIntent, point_count: usize) -> Self {
        match intent {
            MeasureIntent::AreaCapable if point_count >= 3 => MeasurementKind::Area,
            _ => MeasurementKind::Linear,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MeasurementKind::Linear => "Linear",
            MeasurementKind::Area => "Area",
        }
    }
}

/// Caller-declared purpose of the measuring tool
///
/// Comes from business context (the service being quoted), not from the
/// shape that was drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum MeasureIntent {
    /// Lengths only (fence runs, trim, edging)
    #[default]
    Linear,
    /// Closed chains of three or more points are areas (sod, paving, paint)
    AreaCapable,
}

impl MeasureIntent {
    /// Derive the intent from a pricing unit such as `"sqft"` or `"ft"`
    pub fn from_service_unit(service_unit: &str) -> Self {
        let normalized: String = service_unit
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '.' && *c != '_')
            .collect();

        let is_area = normalized.starts_with("sq")
            || normalized.ends_with('2')
            || normalized.ends_with('²')
            || normalized.starts_with("square")
            || normalized.starts_with("acre")
            || normalized == "hectare"
            || normalized == "ha";

        if is_area {
            MeasureIntent::AreaCapable
        } else {
            MeasureIntent::Linear
        }
    }
}

/// A finished measurement
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "MeasurementRecord")]
pub struct Measurement {
    /// Unique identifier
    id: MeasurementId,
    /// User-facing label
    label: String,
    /// Pixel-space vertices, at least two
    points: Vec<Point>,
    /// Linear or area
    kind: MeasurementKind,
    /// Length in units, or area in square units
    value_real_units: f64,
    /// Base unit of `value_real_units` ("px" when uncalibrated)
    unit: String,
    /// False when the value is a raw pixel count
    calibrated: bool,
}

/// Wire form of [`Measurement`], checked for point count on the way in
#[derive(serde::Deserialize)]
struct MeasurementRecord {
    id: MeasurementId,
    label: String,
    points: Vec<Point>,
    kind: MeasurementKind,
    value_real_units: f64,
    unit: String,
    calibrated: bool,
}

impl TryFrom<MeasurementRecord> for Measurement {
    type Error = MeasureError;

    fn try_from(record: MeasurementRecord) -> MeasureResult<Self> {
        check_point_count(record.kind, record.points.len())?;
        Ok(Self {
            id: record.id,
            label: record.label,
            points: record.points,
            kind: record.kind,
            value_real_units: record.value_real_units,
            unit: record.unit,
            calibrated: record.calibrated,
        })
    }
}

fn check_point_count(kind: MeasurementKind, actual: usize) -> MeasureResult<()> {
    let required = match kind {
        MeasurementKind::Linear => 2,
        MeasurementKind::Area => 3,
    };
    if actual < required {
        return Err(MeasureError::InsufficientPoints { required, actual });
    }
    Ok(())
}

impl Measurement {
    /// Build a measurement and derive its value under `scale`
    ///
    /// Fails if there are fewer than two points, or fewer than three for an
    /// area.
    pub fn new(
        label: impl Into<String>,
        points: Vec<Point>,
        kind: MeasurementKind,
        scale: &Scale,
    ) -> MeasureResult<Self> {
        check_point_count(kind, points.len())?;

        let mut measurement = Self {
            id: MeasurementId::new_v4(),
            label: label.into(),
            points,
            kind,
            value_real_units: 0.0,
            unit: String::new(),
            calibrated: false,
        };
        measurement.reproject(scale);
        Ok(measurement)
    }

    /// Get the measurement ID
    pub fn id(&self) -> MeasurementId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn kind(&self) -> MeasurementKind {
        self.kind
    }

    /// Derived value: units for linear, square units for area
    pub fn value_real_units(&self) -> f64 {
        self.value_real_units
    }

    /// Base unit ("ft", "m", or "px" when uncalibrated)
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Whether `value_real_units` is in real units rather than pixels
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Unit suffix for display, squared for areas
    pub fn display_unit(&self) -> String {
        match self.kind {
            MeasurementKind::Linear => self.unit.clone(),
            MeasurementKind::Area => format!("{}²", self.unit),
        }
    }

    /// Value rounded for display, e.g. "6.00 ft²"
    pub fn formatted_value(&self) -> String {
        format_value(self.value_real_units, &self.display_unit())
    }

    /// Pixel-space value: length in px or area in px²
    pub fn pixel_value(&self) -> f64 {
        pixel_value(&self.points, self.kind)
    }

    /// Perimeter for areas, path length for linear measurements, in pixels
    pub fn pixel_length(&self) -> f64 {
        match self.kind {
            MeasurementKind::Linear => polyline_length(&self.points),
            MeasurementKind::Area => {
                let mut closed = self.points.clone();
                closed.push(self.points[0]);
                polyline_length(&closed)
            }
        }
    }

    /// Value this measurement should hold under `scale`
    pub fn expected_value(&self, scale: &Scale) -> f64 {
        project(self.pixel_value(), self.kind, scale)
    }

    /// Recompute the real-unit value for a new scale; points are untouched
    pub(crate) fn reproject(&mut self, scale: &Scale) {
        self.value_real_units = self.expected_value(scale);
        self.unit = scale.effective_unit().to_string();
        self.calibrated = scale.is_calibrated();
    }

    /// Position for the value label, in pixel space
    ///
    /// Linear: the point halfway along the path. Area: vertex centroid.
    pub fn label_position(&self) -> Point {
        match self.kind {
            MeasurementKind::Linear => {
                let total_length = polyline_length(&self.points);
                let half_length = total_length / 2.0;

                let mut accumulated = 0.0;
                for window in self.points.windows(2) {
                    let segment_length = window[0].distance_to(&window[1]);
                    if segment_length > 0.0 && accumulated + segment_length >= half_length {
                        let t = (half_length - accumulated) / segment_length;
                        return Point::new(
                            window[0].x + t * (window[1].x - window[0].x),
                            window[0].y + t * (window[1].y - window[0].y),
                        );
                    }
                    accumulated += segment_length;
                }

                self.points[0]
            }
            MeasurementKind::Area => {
                let n = self.points.len() as f64;
                let sum_x: f64 = self.points.iter().map(|p| p.x).sum();
                let sum_y: f64 = self.points.iter().map(|p| p.y).sum();
                Point::new(sum_x / n, sum_y / n)
            }
        }
    }
}

/// Pixel-space value of `points` measured as `kind`
pub fn pixel_value(points: &[Point], kind: MeasurementKind) -> f64 {
    match kind {
        MeasurementKind::Linear => polyline_length(points),
        MeasurementKind::Area => polygon_area(points),
    }
}

/// Project a pixel value of the given kind through `scale`
pub fn project(pixel_value: f64, kind: MeasurementKind, scale: &Scale) -> f64 {
    match kind {
        MeasurementKind::Linear => to_real_units(pixel_value, scale),
        MeasurementKind::Area => to_real_area(pixel_value, scale),
    }
}

/// Freehand markup stroke
///
/// Carries no value; it exists so the eraser can remove sketch marks the
/// same way it removes measurements.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stroke {
    id: StrokeId,
    points: Vec<Point>,
}

impl Stroke {
    pub fn new(points: Vec<Point>) -> Self {
        Self { id: StrokeId::new_v4(), points }
    }

    pub fn id(&self) -> StrokeId {
        self.id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}
