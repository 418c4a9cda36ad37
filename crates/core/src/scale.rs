//! Scale system and two-point calibration
//!
//! A [`Scale`] converts pixel distances into real-world units. The
//! [`ScaleCalibrator`] derives one from a reference segment the user draws
//! over something of known length (a doorway, a dimension line, a fence run).

use crate::error::{MeasureError, MeasureResult};
use crate::geometry::{distance, Point};

/// Unit shown while no scale has been calibrated
pub const PIXEL_UNIT: &str = "px";

/// Conversion between canvas pixels and a real-world unit
///
/// A non-positive (or non-finite) `pixels_per_unit` means uncalibrated.
/// Conversions never divide by it in that state.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "ScaleRecord")]
pub struct Scale {
    /// Pixels per real-world unit
    pixels_per_unit: f64,
    /// Unit of measurement (e.g., "ft", "m")
    unit: String,
    /// Derived from `pixels_per_unit`, serialized for consumers
    calibrated: bool,
}

#[derive(serde::Deserialize)]
struct ScaleRecord {
    pixels_per_unit: f64,
    unit: String,
}

impl From<ScaleRecord> for Scale {
    fn from(record: ScaleRecord) -> Self {
        Scale::new(record.pixels_per_unit, record.unit)
    }
}

impl Scale {
    /// Create a scale with an explicit ratio
    pub fn new(pixels_per_unit: f64, unit: impl Into<String>) -> Self {
        Self {
            pixels_per_unit,
            unit: unit.into(),
            calibrated: pixels_per_unit.is_finite() && pixels_per_unit > 0.0,
        }
    }

    /// Create the "no scale yet" placeholder for a unit
    pub fn uncalibrated(unit: impl Into<String>) -> Self {
        Self::new(0.0, unit)
    }

    /// Get the ratio (pixels per real-world unit)
    pub fn pixels_per_unit(&self) -> f64 {
        self.pixels_per_unit
    }

    /// Get the configured unit, even if not yet calibrated
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The unit values are actually expressed in
    ///
    /// Pixels until a calibration succeeds.
    pub fn effective_unit(&self) -> &str {
        if self.calibrated {
            &self.unit
        } else {
            PIXEL_UNIT
        }
    }

    /// Whether real-unit conversion is possible
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }
}

impl Default for Scale {
    fn default() -> Self {
        Self::uncalibrated("ft")
    }
}

/// Where the calibrator is in its two-click capture
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationState {
    /// Not calibrating; clicks belong to the measurement tools
    Idle,
    /// Waiting for the first end of the reference segment
    AwaitingFirstPoint,
    /// First end captured, waiting for the second
    AwaitingSecondPoint { first: Point },
}

/// Outcome of feeding a point to the calibrator
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationStep {
    /// Calibrator was idle and ignored the point
    Inactive,
    /// First reference point captured
    FirstPointCaptured(Point),
    /// Reference complete; the new scale is ready to apply
    Calibrated(Scale),
}

/// Two-point calibration state machine
///
/// Holds the transient reference segment. It never produces a measurement;
/// the only output is a [`Scale`].
#[derive(Debug, Clone)]
pub struct ScaleCalibrator {
    state: CalibrationState,
    known_length: f64,
    unit: String,
    /// Reference segments shorter than this (pixels) are rejected
    min_reference_px: f64,
}

impl ScaleCalibrator {
    /// Create an idle calibrator
    pub fn new(min_reference_px: f64) -> Self {
        Self {
            state: CalibrationState::Idle,
            known_length: 0.0,
            unit: String::new(),
            min_reference_px,
        }
    }

    /// Start capturing a reference segment of `known_length` real units
    ///
    /// Rejects non-positive or non-finite lengths and stays idle.
    pub fn begin(&mut self, known_length: f64, unit: impl Into<String>) -> MeasureResult<()> {
        if !known_length.is_finite() || known_length <= 0.0 {
            return Err(MeasureError::InvalidCalibrationInput(known_length));
        }

        self.known_length = known_length;
        self.unit = unit.into();
        self.state = CalibrationState::AwaitingFirstPoint;
        Ok(())
    }

    /// Feed one pointer placement into the calibration
    ///
    /// Coincident points fail with `DegenerateCalibration` and rewind to
    /// waiting for a fresh first point.
    pub fn place_point(&mut self, point: Point) -> MeasureResult<CalibrationStep> {
        match self.state {
            CalibrationState::Idle => Ok(CalibrationStep::Inactive),
            CalibrationState::AwaitingFirstPoint => {
                self.state = CalibrationState::AwaitingSecondPoint { first: point };
                Ok(CalibrationStep::FirstPointCaptured(point))
            }
            CalibrationState::AwaitingSecondPoint { first } => {
                let pixel_length = distance(first, point);
                if pixel_length <= self.min_reference_px {
                    self.state = CalibrationState::AwaitingFirstPoint;
                    return Err(MeasureError::DegenerateCalibration);
                }

                let scale = Scale::new(pixel_length / self.known_length, self.unit.clone());
                self.reset();
                Ok(CalibrationStep::Calibrated(scale))
            }
        }
    }

    /// Abandon the reference segment
    pub fn cancel(&mut self) {
        self.reset();
    }

    /// Current state
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Whether clicks are currently captured for calibration
    pub fn is_active(&self) -> bool {
        self.state != CalibrationState::Idle
    }

    /// First reference point, for drawing the rubber band
    pub fn first_point(&self) -> Option<Point> {
        match self.state {
            CalibrationState::AwaitingSecondPoint { first } => Some(first),
            _ => None,
        }
    }

    /// Known length entered for the active calibration
    pub fn known_length(&self) -> Option<f64> {
        self.is_active().then_some(self.known_length)
    }

    fn reset(&mut self) {
        self.state = CalibrationState::Idle;
        self.known_length = 0.0;
        self.unit.clear();
    }
}

impl Default for ScaleCalibrator {
    fn default() -> Self {
        Self::new(1e-9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_scale() {
        let scale = Scale::new(72.0, "in");
        assert!(scale.is_calibrated());
        assert_eq!(scale.unit(), "in");
        assert_eq!(scale.effective_unit(), "in");
        assert_eq!(scale.pixels_per_unit(), 72.0);
    }

    #[test]
    fn test_non_positive_ratio_is_uncalibrated() {
        for ratio in [0.0, -4.0, f64::NAN, f64::INFINITY] {
            let scale = Scale::new(ratio, "m");
            assert!(!scale.is_calibrated());
            assert_eq!(scale.effective_unit(), PIXEL_UNIT);
        }
    }

    #[test]
    fn test_two_point_calibration() {
        let mut calibrator = ScaleCalibrator::default();
        calibrator.begin(10.0, "ft").unwrap();
        assert_eq!(calibrator.state(), CalibrationState::AwaitingFirstPoint);

        let step = calibrator.place_point(Point::new(0.0, 0.0)).unwrap();
        assert_eq!(step, CalibrationStep::FirstPointCaptured(Point::new(0.0, 0.0)));
        assert_eq!(calibrator.first_point(), Some(Point::new(0.0, 0.0)));

        let step = calibrator.place_point(Point::new(100.0, 0.0)).unwrap();
        let CalibrationStep::Calibrated(scale) = step else {
            panic!("expected a scale, got {step:?}");
        };
        assert_eq!(scale.pixels_per_unit(), 10.0);
        assert_eq!(scale.unit(), "ft");
        assert!(!calibrator.is_active());
    }

    #[test]
    fn test_begin_rejects_bad_length() {
        let mut calibrator = ScaleCalibrator::default();
        for bad in [0.0, -1.0, f64::NAN] {
            let err = calibrator.begin(bad, "ft").unwrap_err();
            assert!(matches!(err, MeasureError::InvalidCalibrationInput(_)));
            assert!(!calibrator.is_active());
        }
    }

    #[test]
    fn test_coincident_points_rewind_to_first_point() {
        let mut calibrator = ScaleCalibrator::default();
        calibrator.begin(3.0, "m").unwrap();
        calibrator.place_point(Point::new(5.0, 5.0)).unwrap();

        let err = calibrator.place_point(Point::new(5.0, 5.0)).unwrap_err();
        assert_eq!(err, MeasureError::DegenerateCalibration);
        assert_eq!(calibrator.state(), CalibrationState::AwaitingFirstPoint);
        assert_eq!(calibrator.known_length(), Some(3.0));
    }

    #[test]
    fn test_idle_calibrator_ignores_points() {
        let mut calibrator = ScaleCalibrator::default();
        assert_eq!(
            calibrator.place_point(Point::new(1.0, 1.0)).unwrap(),
            CalibrationStep::Inactive
        );
    }

    #[test]
    fn test_cancel_discards_reference() {
        let mut calibrator = ScaleCalibrator::default();
        calibrator.begin(3.0, "m").unwrap();
        calibrator.place_point(Point::new(1.0, 1.0)).unwrap();
        calibrator.cancel();
        assert_eq!(calibrator.state(), CalibrationState::Idle);
        assert_eq!(calibrator.first_point(), None);
        assert_eq!(calibrator.known_length(), None);
    }

    #[test]
    fn test_scale_deserialize_recomputes_flag() {
        let scale: Scale =
            serde_json::from_str(r#"{"pixels_per_unit":0.0,"unit":"ft","calibrated":true}"#)
                .unwrap();
        assert!(!scale.is_calibrated());

        let json = serde_json::to_string(&Scale::new(12.0, "m")).unwrap();
        let back: Scale = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Scale::new(12.0, "m"));
    }
}
