//! Pointer and command handling for the measuring tools
//!
//! The controller turns raw input into session mutations:
//!
//! - screen coordinates are mapped through the [`ViewTransform`] into canvas
//!   pixels before any geometry sees them
//! - while calibrating, clicks feed the calibrator and nothing else
//! - two clicks inside the double-click window finish the chain
//! - failures are caught and reported as [`Feedback::Rejected`]; the session
//!   keeps its previous state

use crate::config::ToolConfig;
use crate::error::MeasureError;
use crate::geometry::Point;
use crate::hit_test::EraseTarget;
use crate::measurement::{MeasurementId, MeasureIntent, StrokeId};
use crate::scale::{CalibrationStep, Scale};
use crate::session::{FinishOutcome, MeasurementSession};
use std::time::Duration;

/// Active drawing tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// Click out point chains
    #[default]
    Measure,
    /// Press-drag-release sketch strokes
    Freehand,
    /// Click to remove the nearest entity
    Erase,
}

/// Controller mode, derived from session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Drawing,
    Calibrating,
}

/// Zoom and pan applied by the host when painting the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    zoom: f64,
    pan: Point,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { zoom: 1.0, pan: Point::new(0.0, 0.0) }
    }
}

impl ViewTransform {
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    /// Screen position to canvas pixels
    pub fn to_canvas(&self, screen: Point) -> Point {
        Point::new((screen.x - self.pan.x) / self.zoom, (screen.y - self.pan.y) / self.zoom)
    }

    /// Canvas pixels to screen position
    pub fn to_screen(&self, canvas: Point) -> Point {
        Point::new(canvas.x * self.zoom + self.pan.x, canvas.y * self.zoom + self.pan.y)
    }
}

/// One discrete input from the host
///
/// Positions are screen coordinates. Timestamps are milliseconds on any
/// monotonic clock the host likes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    Click { x: f64, y: f64, at_ms: u64 },
    Hover { x: f64, y: f64 },
    DragPoint { index: usize, x: f64, y: f64 },
    StrokeStart { x: f64, y: f64 },
    StrokeMove { x: f64, y: f64 },
    StrokeEnd,
    Finish { label: Option<String> },
    Cancel,
    Undo,
    Redo,
    EraseAt { x: f64, y: f64 },
    Delete { id: MeasurementId },
    ClearAll,
    BeginCalibration { known_length: f64, unit: Option<String> },
    CancelCalibration,
    SetZoom { zoom: f64 },
    SetPan { x: f64, y: f64 },
    SetTool { tool: Tool },
    SetIntent { intent: MeasureIntent },
}

/// What an input did, for status lines and tests
#[derive(Debug, Clone, PartialEq)]
pub enum Feedback {
    ChainStarted(Point),
    PointAdded { index: usize, point: Point },
    PointMoved { index: usize },
    PreviewMoved,
    Committed { id: MeasurementId, calibrated: bool },
    Discarded { real_length: f64 },
    ChainCancelled,
    Undone,
    Redone,
    StrokeStarted,
    StrokeCommitted(StrokeId),
    Erased(EraseTarget),
    Deleted(MeasurementId),
    Cleared,
    CalibrationStarted,
    CalibrationPointCaptured(Point),
    Calibrated(Scale),
    CalibrationCancelled,
    ViewChanged,
    ToolChanged(Tool),
    IntentChanged(MeasureIntent),
    /// Input had no effect in the current mode
    Ignored,
    /// Input failed; session unchanged
    Rejected(MeasureError),
}

/// Input state machine wrapped around a [`MeasurementSession`]
#[derive(Debug)]
pub struct InteractionController {
    session: MeasurementSession,
    view: ViewTransform,
    tool: Tool,
    double_click_window: Duration,
    last_click: Option<Duration>,
    stroke: Option<Vec<Point>>,
}

impl InteractionController {
    /// Create a controller over a fresh session
    pub fn new(intent: MeasureIntent, config: ToolConfig) -> Self {
        Self::with_session(MeasurementSession::new(intent, config))
    }

    /// Create a controller over an existing (e.g. restored) session
    pub fn with_session(session: MeasurementSession) -> Self {
        let double_click_window = session.config().double_click_window();
        Self {
            session,
            view: ViewTransform::default(),
            tool: Tool::default(),
            double_click_window,
            last_click: None,
            stroke: None,
        }
    }

    pub fn session(&self) -> &MeasurementSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut MeasurementSession {
        &mut self.session
    }

    pub fn into_session(self) -> MeasurementSession {
        self.session
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Stroke being drawn, if any
    pub fn pending_stroke(&self) -> Option<&[Point]> {
        self.stroke.as_deref()
    }

    pub fn mode(&self) -> Mode {
        if self.session.is_calibrating() {
            Mode::Calibrating
        } else if self.session.chain().is_empty() {
            Mode::Idle
        } else {
            Mode::Drawing
        }
    }

    /// Dispatch one input event
    pub fn handle(&mut self, event: InputEvent) -> Feedback {
        match event {
            InputEvent::Click { x, y, at_ms } => {
                self.click(Point::new(x, y), Duration::from_millis(at_ms))
            }
            InputEvent::Hover { x, y } => self.hover(Point::new(x, y)),
            InputEvent::DragPoint { index, x, y } => self.drag_point(index, Point::new(x, y)),
            InputEvent::StrokeStart { x, y } => self.stroke_start(Point::new(x, y)),
            InputEvent::StrokeMove { x, y } => self.stroke_move(Point::new(x, y)),
            InputEvent::StrokeEnd => self.stroke_end(),
            InputEvent::Finish { label } => self.finish(label.as_deref()),
            InputEvent::Cancel => self.cancel(),
            InputEvent::Undo => self.undo(),
            InputEvent::Redo => self.redo(),
            InputEvent::EraseAt { x, y } => self.erase_at(Point::new(x, y)),
            InputEvent::Delete { id } => match self.session.delete_measurement(id) {
                Ok(()) => Feedback::Deleted(id),
                Err(err) => Feedback::Rejected(err),
            },
            InputEvent::ClearAll => {
                self.session.clear_all();
                self.last_click = None;
                self.stroke = None;
                Feedback::Cleared
            }
            InputEvent::BeginCalibration { known_length, unit } => {
                self.begin_calibration(known_length, unit)
            }
            InputEvent::CancelCalibration => {
                if !self.session.is_calibrating() {
                    return Feedback::Ignored;
                }
                self.session.cancel_calibration();
                Feedback::CalibrationCancelled
            }
            InputEvent::SetZoom { zoom } => self.set_zoom(zoom),
            InputEvent::SetPan { x, y } => {
                self.view.pan = Point::new(x, y);
                Feedback::ViewChanged
            }
            InputEvent::SetTool { tool } => {
                self.set_tool(tool);
                Feedback::ToolChanged(tool)
            }
            InputEvent::SetIntent { intent } => {
                self.session.set_intent(intent);
                Feedback::IntentChanged(intent)
            }
        }
    }

    /// Primary click at a screen position
    pub fn click(&mut self, screen: Point, at: Duration) -> Feedback {
        let point = self.view.to_canvas(screen);

        if self.session.is_calibrating() {
            self.last_click = None;
            return match self.session.place_calibration_point(point) {
                Ok(CalibrationStep::FirstPointCaptured(p)) => Feedback::CalibrationPointCaptured(p),
                Ok(CalibrationStep::Calibrated(scale)) => Feedback::Calibrated(scale),
                Ok(CalibrationStep::Inactive) => Feedback::Ignored,
                Err(err) => Feedback::Rejected(err),
            };
        }

        match self.tool {
            Tool::Measure => {}
            Tool::Erase => return self.erase_at(screen),
            Tool::Freehand => return Feedback::Ignored,
        }

        let is_double_click = self
            .last_click
            .is_some_and(|previous| at >= previous && at - previous <= self.double_click_window);

        if is_double_click && self.session.chain().len() >= 2 {
            self.last_click = None;
            return self.finish(None);
        }

        self.last_click = Some(at);
        let starting = self.session.chain().is_empty();
        self.session.add_point(point);

        if starting {
            Feedback::ChainStarted(point)
        } else {
            Feedback::PointAdded { index: self.session.chain().len() - 1, point }
        }
    }

    /// Pointer moved without a button: update the rubber band
    pub fn hover(&mut self, screen: Point) -> Feedback {
        if self.mode() != Mode::Drawing {
            return Feedback::Ignored;
        }
        self.session.update_preview(self.view.to_canvas(screen));
        Feedback::PreviewMoved
    }

    /// Drag a placed point of the in-progress chain
    pub fn drag_point(&mut self, index: usize, screen: Point) -> Feedback {
        if self.mode() != Mode::Drawing {
            return Feedback::Ignored;
        }
        if self.session.move_point(index, self.view.to_canvas(screen)) {
            Feedback::PointMoved { index }
        } else {
            Feedback::Ignored
        }
    }

    /// Finish the chain explicitly
    pub fn finish(&mut self, label: Option<&str>) -> Feedback {
        if self.session.is_calibrating() {
            return Feedback::Ignored;
        }
        self.last_click = None;
        let intent = self.session.intent();
        match self.session.finish_chain(label, intent) {
            Ok(FinishOutcome::Committed(id)) => {
                let calibrated = self.session.scale().is_calibrated();
                if !calibrated {
                    tracing::warn!(
                        %id,
                        "measurement stored in pixels; calibrate to get real units"
                    );
                }
                Feedback::Committed { id, calibrated }
            }
            Ok(FinishOutcome::Discarded { real_length }) => Feedback::Discarded { real_length },
            Err(err) => Feedback::Rejected(err),
        }
    }

    /// Escape: abandon calibration first, then the chain
    pub fn cancel(&mut self) -> Feedback {
        self.last_click = None;
        if self.session.is_calibrating() {
            self.session.cancel_calibration();
            return Feedback::CalibrationCancelled;
        }
        if self.stroke.take().is_some() {
            return Feedback::ChainCancelled;
        }
        if self.session.chain().is_empty() {
            return Feedback::Ignored;
        }
        self.session.cancel_chain();
        Feedback::ChainCancelled
    }

    pub fn undo(&mut self) -> Feedback {
        self.last_click = None;
        if self.session.undo_point() {
            Feedback::Undone
        } else {
            Feedback::Ignored
        }
    }

    pub fn redo(&mut self) -> Feedback {
        self.last_click = None;
        if self.session.redo_point() {
            Feedback::Redone
        } else {
            Feedback::Ignored
        }
    }

    /// Erase the nearest entity to a screen position
    pub fn erase_at(&mut self, screen: Point) -> Feedback {
        match self.session.erase_at(self.view.to_canvas(screen)) {
            Some(target) => Feedback::Erased(target),
            None => Feedback::Ignored,
        }
    }

    pub fn stroke_start(&mut self, screen: Point) -> Feedback {
        if self.tool != Tool::Freehand || self.session.is_calibrating() {
            return Feedback::Ignored;
        }
        self.stroke = Some(vec![self.view.to_canvas(screen)]);
        Feedback::StrokeStarted
    }

    pub fn stroke_move(&mut self, screen: Point) -> Feedback {
        let point = self.view.to_canvas(screen);
        match self.stroke.as_mut() {
            Some(points) => {
                points.push(point);
                Feedback::PreviewMoved
            }
            None => Feedback::Ignored,
        }
    }

    pub fn stroke_end(&mut self) -> Feedback {
        let Some(points) = self.stroke.take() else {
            return Feedback::Ignored;
        };
        match self.session.add_stroke(points) {
            Some(id) => Feedback::StrokeCommitted(id),
            None => Feedback::Ignored,
        }
    }

    /// Enter calibration; the in-progress chain is kept for afterwards
    pub fn begin_calibration(&mut self, known_length: f64, unit: Option<String>) -> Feedback {
        let unit = unit.unwrap_or_else(|| self.session.scale().unit().to_string());
        match self.session.begin_calibration(known_length, unit) {
            Ok(()) => {
                self.last_click = None;
                self.stroke = None;
                Feedback::CalibrationStarted
            }
            Err(err) => Feedback::Rejected(err),
        }
    }

    /// Change zoom; non-positive or non-finite values are ignored
    pub fn set_zoom(&mut self, zoom: f64) -> Feedback {
        if !zoom.is_finite() || zoom <= 0.0 {
            return Feedback::Ignored;
        }
        self.view.zoom = zoom;
        Feedback::ViewChanged
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if tool != self.tool {
            self.stroke = None;
            self.last_click = None;
        }
        self.tool = tool;
    }
}
