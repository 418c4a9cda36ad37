//! Error taxonomy for the measurement engine
//!
//! Every variant is recoverable: the session is left exactly as it was
//! before the failing call.

use crate::measurement::MeasurementId;

/// Errors raised by calibration, chain finishing and snapshot validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeasureError {
    /// Known reference length was zero, negative or not finite
    #[error("calibration length must be a positive number, got {0}")]
    InvalidCalibrationInput(f64),

    /// Both calibration points landed on the same pixel
    #[error("calibration points coincide; pick two distinct points")]
    DegenerateCalibration,

    /// Finish requested before the chain had enough points
    #[error("a measurement needs at least {required} points, chain has {actual}")]
    InsufficientPoints { required: usize, actual: usize },

    /// Real-unit conversion requested without a valid scale
    #[error("no scale calibrated; values are in pixels")]
    Uncalibrated,

    /// No measurement with the given id exists in the session
    #[error("measurement not found: {0}")]
    MeasurementNotFound(MeasurementId),

    /// Loaded state does not agree with its own geometry
    #[error("inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),
}

/// Result alias for engine operations
pub type MeasureResult<T> = Result<T, MeasureError>;
