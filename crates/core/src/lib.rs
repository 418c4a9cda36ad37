//! Takeoff Core Library
//!
//! Measurement and scale-calibration engine for on-canvas takeoffs: calibrate
//! a pixel-to-unit scale from a reference segment, then trace point chains
//! into linear and area measurements.

pub mod chain;
pub mod config;
pub mod csv_export;
pub mod error;
pub mod geometry;
pub mod hit_test;
pub mod interaction;
pub mod measurement;
pub mod persistence;
pub mod scale;
pub mod session;

pub use chain::PointChain;
pub use config::ToolConfig;
pub use csv_export::{export_measurements_csv, CsvExportConfig, CsvExportError};
pub use error::{MeasureError, MeasureResult};
pub use geometry::{distance, polygon_area, polyline_length, to_real_units, Point};
pub use hit_test::EraseTarget;
pub use interaction::{Feedback, InputEvent, InteractionController, Mode, Tool, ViewTransform};
pub use measurement::{Measurement, MeasurementId, MeasurementKind, MeasureIntent, Stroke, StrokeId};
pub use persistence::{PersistenceError, SessionSnapshot};
pub use scale::{CalibrationState, CalibrationStep, Scale, ScaleCalibrator};
pub use session::{
    ChangeReason, FinishOutcome, MeasurementSession, SessionChange, SubscriptionId, TakeoffSummary,
};
