//! Measurement session
//!
//! The session is the single owner of the active [`Scale`], the committed
//! measurements, freehand strokes and the in-progress chain. Every change to
//! the measurement list or the scale goes through a method here and is
//! announced synchronously to all subscribers, one notification per change.
//!
//! The session is `Send`. Hosts that share it across threads wrap it in a
//! mutex; scale re-projection happens inside a single `&mut self` call.

use crate::chain::PointChain;
use crate::config::ToolConfig;
use crate::error::{MeasureError, MeasureResult};
use crate::geometry::{polyline_length, to_real_units, Point};
use crate::hit_test::{nearest_erasable, EraseTarget};
use crate::measurement::{
    Measurement, MeasurementId, MeasurementKind, MeasureIntent, Stroke, StrokeId,
};
use crate::persistence::SessionSnapshot;
use crate::scale::{CalibrationStep, Scale, ScaleCalibrator};
use std::collections::HashSet;

/// Absolute tolerance when re-validating stored values (two-decimal rounding)
const STORED_VALUE_TOLERANCE: f64 = 0.005;

/// Why subscribers are being notified
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeReason {
    MeasurementAdded(MeasurementId),
    MeasurementDeleted(MeasurementId),
    StrokeAdded(StrokeId),
    StrokeErased(StrokeId),
    ScaleChanged,
    Cleared,
}

/// Full state delivered with every notification
#[derive(Debug)]
pub struct SessionChange<'a> {
    pub reason: ChangeReason,
    pub measurements: &'a [Measurement],
    pub scale: &'a Scale,
}

/// Handle returned by [`MeasurementSession::subscribe`]
pub type SubscriptionId = u64;

type Listener = Box<dyn FnMut(&SessionChange<'_>) + Send>;

/// Result of finishing the in-progress chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FinishOutcome {
    /// A measurement was stored
    Committed(MeasurementId),
    /// The chain was too short to be deliberate and was thrown away
    Discarded { real_length: f64 },
}

/// Totals handed to quantity and pricing consumers
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TakeoffSummary {
    pub count: usize,
    pub linear_total: f64,
    pub area_total: f64,
    pub unit: String,
    pub calibrated: bool,
}

/// Owner of all measuring state for one mounted tool
pub struct MeasurementSession {
    config: ToolConfig,
    intent: MeasureIntent,
    scale: Scale,
    measurements: Vec<Measurement>,
    strokes: Vec<Stroke>,
    chain: PointChain,
    calibrator: ScaleCalibrator,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: SubscriptionId,
}

impl std::fmt::Debug for MeasurementSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementSession")
            .field("intent", &self.intent)
            .field("scale", &self.scale)
            .field("measurements", &self.measurements.len())
            .field("strokes", &self.strokes.len())
            .field("chain", &self.chain.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl MeasurementSession {
    /// Create an empty, uncalibrated session
    pub fn new(intent: MeasureIntent, config: ToolConfig) -> Self {
        let scale = Scale::uncalibrated(config.default_unit.clone());
        let calibrator = ScaleCalibrator::new(config.min_reference_px);
        Self {
            config,
            intent,
            scale,
            measurements: Vec::new(),
            strokes: Vec::new(),
            chain: PointChain::new(),
            calibrator,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Rebuild a session from persisted state
    ///
    /// Each stored value must agree with its geometry under the stored scale
    /// (within two-decimal rounding). Accepted values are normalized to full
    /// precision.
    pub fn from_snapshot(
        snapshot: SessionSnapshot,
        intent: MeasureIntent,
        config: ToolConfig,
    ) -> MeasureResult<Self> {
        let SessionSnapshot { mut measurements, scale, unit, strokes } = snapshot;

        if unit != scale.unit() {
            return Err(MeasureError::InconsistentSnapshot(format!(
                "session unit {unit:?} does not match scale unit {:?}",
                scale.unit()
            )));
        }

        let mut seen = HashSet::new();
        for measurement in &mut measurements {
            validate_stored(measurement, &scale)?;
            if !seen.insert(measurement.id()) {
                return Err(MeasureError::InconsistentSnapshot(format!(
                    "duplicate measurement id {}",
                    measurement.id()
                )));
            }
            measurement.reproject(&scale);
        }

        tracing::debug!(
            measurements = measurements.len(),
            strokes = strokes.len(),
            calibrated = scale.is_calibrated(),
            "restored measurement session"
        );

        let mut session = Self::new(intent, config);
        session.scale = scale;
        session.measurements = measurements;
        session.strokes = strokes;
        Ok(session)
    }

    /// Capture the persistable state
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            measurements: self.measurements.clone(),
            scale: self.scale.clone(),
            unit: self.scale.unit().to_string(),
            strokes: self.strokes.clone(),
        }
    }

    // --- Observers -------------------------------------------------------

    /// Register a callback run after every mutation
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&SessionChange<'_>) + Send + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a callback; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, reason: ChangeReason) {
        let change = SessionChange {
            reason,
            measurements: &self.measurements,
            scale: &self.scale,
        };
        for (_, listener) in &mut self.listeners {
            listener(&change);
        }
    }

    // --- Accessors -------------------------------------------------------

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn intent(&self) -> MeasureIntent {
        self.intent
    }

    /// Change the declared measuring purpose for subsequent finishes
    pub fn set_intent(&mut self, intent: MeasureIntent) {
        self.intent = intent;
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn measurement(&self, id: MeasurementId) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.id() == id)
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn chain(&self) -> &PointChain {
        &self.chain
    }

    pub fn calibrator(&self) -> &ScaleCalibrator {
        &self.calibrator
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibrator.is_active()
    }

    /// Reports `Uncalibrated` so hosts can warn that values are in pixels
    pub fn ensure_calibrated(&self) -> MeasureResult<()> {
        if self.scale.is_calibrated() {
            Ok(())
        } else {
            Err(MeasureError::Uncalibrated)
        }
    }

    // --- In-progress chain ----------------------------------------------

    pub fn add_point(&mut self, point: Point) {
        self.chain.add_point(point);
    }

    pub fn update_preview(&mut self, point: Point) {
        self.chain.update_preview(point);
    }

    pub fn move_point(&mut self, index: usize, point: Point) -> bool {
        self.chain.move_point(index, point)
    }

    pub fn undo_point(&mut self) -> bool {
        self.chain.undo()
    }

    pub fn redo_point(&mut self) -> bool {
        self.chain.redo()
    }

    /// Drop the in-progress chain without creating a measurement
    pub fn cancel_chain(&mut self) {
        self.chain.clear();
    }

    /// Turn the in-progress chain into a measurement
    ///
    /// `intent` decides whether a chain of three or more points is an area.
    /// Chains whose real length is under the configured minimum are dropped.
    /// On `InsufficientPoints` the chain is left as it was.
    pub fn finish_chain(
        &mut self,
        label: Option<&str>,
        intent: MeasureIntent,
    ) -> MeasureResult<FinishOutcome> {
        self.chain.ensure_finishable()?;

        let real_length = to_real_units(polyline_length(self.chain.points()), &self.scale);
        if real_length < self.config.min_real_length {
            self.chain.clear();
            tracing::debug!(real_length, "discarded measurement below minimum length");
            return Ok(FinishOutcome::Discarded { real_length });
        }

        let kind = MeasurementKind::classify(intent, self.chain.len());
        let label = match label {
            Some(label) if !label.trim().is_empty() => label.trim().to_string(),
            _ => self.default_label(kind),
        };

        let measurement = Measurement::new(label, self.chain.points().to_vec(), kind, &self.scale)?;
        self.chain.clear();
        Ok(FinishOutcome::Committed(self.add_measurement(measurement)))
    }

    fn default_label(&self, kind: MeasurementKind) -> String {
        let ordinal = self.measurements.iter().filter(|m| m.kind() == kind).count() + 1;
        format!("{} {}", kind.name(), ordinal)
    }

    // --- Measurement list -----------------------------------------------

    /// Store a measurement, re-deriving its value under the active scale
    pub fn add_measurement(&mut self, mut measurement: Measurement) -> MeasurementId {
        measurement.reproject(&self.scale);
        let id = measurement.id();

        tracing::debug!(
            %id,
            kind = measurement.kind().name(),
            value = measurement.value_real_units(),
            unit = measurement.unit(),
            "measurement committed"
        );

        self.measurements.push(measurement);
        self.notify(ChangeReason::MeasurementAdded(id));
        id
    }

    pub fn delete_measurement(&mut self, id: MeasurementId) -> MeasureResult<()> {
        let index = self
            .measurements
            .iter()
            .position(|m| m.id() == id)
            .ok_or(MeasureError::MeasurementNotFound(id))?;
        self.measurements.remove(index);
        self.notify(ChangeReason::MeasurementDeleted(id));
        Ok(())
    }

    /// Record a freehand stroke; single-point strokes are ignored
    pub fn add_stroke(&mut self, points: Vec<Point>) -> Option<StrokeId> {
        if points.len() < 2 {
            return None;
        }
        let stroke = Stroke::new(points);
        let id = stroke.id();
        self.strokes.push(stroke);
        self.notify(ChangeReason::StrokeAdded(id));
        Some(id)
    }

    /// Remove the one measurement or stroke nearest to `point`
    ///
    /// Only entities with a vertex inside the configured radius qualify.
    /// At most one entity is removed per call.
    pub fn erase_at(&mut self, point: Point) -> Option<EraseTarget> {
        let hit = nearest_erasable(
            &self.measurements,
            &self.strokes,
            point,
            self.config.erase_radius_px,
        )?;

        match hit.target {
            EraseTarget::Measurement(id) => {
                self.measurements.retain(|m| m.id() != id);
                tracing::debug!(%id, distance = hit.distance, "erased measurement");
                self.notify(ChangeReason::MeasurementDeleted(id));
            }
            EraseTarget::Stroke(id) => {
                self.strokes.retain(|s| s.id() != id);
                tracing::debug!(%id, distance = hit.distance, "erased stroke");
                self.notify(ChangeReason::StrokeErased(id));
            }
        }
        Some(hit.target)
    }

    /// Discard all measurements, strokes, the chain and the scale
    pub fn clear_all(&mut self) {
        self.measurements.clear();
        self.strokes.clear();
        self.chain.clear();
        self.calibrator.cancel();
        self.scale = Scale::uncalibrated(self.config.default_unit.clone());
        self.notify(ChangeReason::Cleared);
    }

    /// Sum of every measurement's value, linear and area alike
    pub fn total_real_value(&self) -> f64 {
        self.measurements.iter().map(|m| m.value_real_units()).sum()
    }

    /// Sum of values for one kind only
    pub fn total_for(&self, kind: MeasurementKind) -> f64 {
        self.measurements
            .iter()
            .filter(|m| m.kind() == kind)
            .map(|m| m.value_real_units())
            .sum()
    }

    pub fn summary(&self) -> TakeoffSummary {
        TakeoffSummary {
            count: self.measurements.len(),
            linear_total: self.total_for(MeasurementKind::Linear),
            area_total: self.total_for(MeasurementKind::Area),
            unit: self.scale.effective_unit().to_string(),
            calibrated: self.scale.is_calibrated(),
        }
    }

    // --- Calibration -----------------------------------------------------

    /// Enter calibration mode for a reference of `known_length` units
    ///
    /// The active scale is untouched until the second point lands.
    pub fn begin_calibration(
        &mut self,
        known_length: f64,
        unit: impl Into<String>,
    ) -> MeasureResult<()> {
        self.calibrator.begin(known_length, unit)
    }

    /// Feed a point to the calibrator, applying the scale when complete
    pub fn place_calibration_point(&mut self, point: Point) -> MeasureResult<CalibrationStep> {
        let step = self.calibrator.place_point(point)?;
        if let CalibrationStep::Calibrated(scale) = &step {
            self.apply_scale(scale.clone());
        }
        Ok(step)
    }

    pub fn cancel_calibration(&mut self) {
        self.calibrator.cancel();
    }

    /// Replace the active scale and re-project every measurement
    pub fn apply_scale(&mut self, scale: Scale) {
        let previous = self.scale.pixels_per_unit();
        self.scale = scale;
        for measurement in &mut self.measurements {
            measurement.reproject(&self.scale);
        }

        tracing::info!(
            previous,
            pixels_per_unit = self.scale.pixels_per_unit(),
            unit = self.scale.unit(),
            reprojected = self.measurements.len(),
            "scale applied"
        );

        self.notify(ChangeReason::ScaleChanged);
    }
}

fn validate_stored(measurement: &Measurement, scale: &Scale) -> MeasureResult<()> {
    let id = measurement.id();
    if measurement.unit() != scale.effective_unit()
        || measurement.is_calibrated() != scale.is_calibrated()
    {
        return Err(MeasureError::InconsistentSnapshot(format!(
            "measurement {id} is in {:?}, scale is in {:?}",
            measurement.unit(),
            scale.effective_unit()
        )));
    }

    let stored = measurement.value_real_units();
    let expected = measurement.expected_value(scale);
    let tolerance = STORED_VALUE_TOLERANCE.max(expected.abs() * 1e-6);
    if !stored.is_finite() || (stored - expected).abs() > tolerance {
        return Err(MeasureError::InconsistentSnapshot(format!(
            "measurement {id} stores {stored}, geometry gives {expected}"
        )));
    }
    Ok(())
}
