//! In-progress point chain with linear undo/redo
//!
//! The chain is the measurement the user is still clicking out. History is
//! kept as whole-chain snapshots: every committed edit pushes the previous
//! state onto the undo stack and clears the redo stack.

use crate::error::{MeasureError, MeasureResult};
use crate::geometry::{polyline_length, Point};

/// Minimum points for any finished measurement
pub const MIN_CHAIN_POINTS: usize = 2;

/// Ordered, uncommitted sequence of points
#[derive(Debug, Clone, Default)]
pub struct PointChain {
    points: Vec<Point>,
    /// Live cursor position for the next segment, never part of `points`
    preview: Option<Point>,
    undo_stack: Vec<Vec<Point>>,
    redo_stack: Vec<Vec<Point>>,
}

impl PointChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed points
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// Append a committed point
    pub fn add_point(&mut self, point: Point) {
        self.checkpoint();
        self.points.push(point);
    }

    /// Move the live preview of the next segment's end
    ///
    /// Does not add a point and does not touch history.
    pub fn update_preview(&mut self, point: Point) {
        if !self.points.is_empty() {
            self.preview = Some(point);
        }
    }

    pub fn preview(&self) -> Option<Point> {
        self.preview
    }

    /// Committed points followed by the preview, for rubber-band drawing
    pub fn points_with_preview(&self) -> Vec<Point> {
        let mut points = self.points.clone();
        points.extend(self.preview);
        points
    }

    /// Drag an already placed point to a new position
    ///
    /// Returns false if `index` is out of range.
    pub fn move_point(&mut self, index: usize, point: Point) -> bool {
        if index >= self.points.len() {
            return false;
        }
        self.checkpoint();
        self.points[index] = point;
        true
    }

    /// Step back one committed state
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.points, previous);
        self.redo_stack.push(current);
        if self.points.is_empty() {
            self.preview = None;
        }
        true
    }

    /// Re-apply the last undone state
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.points, next);
        self.undo_stack.push(current);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Pixel length of the committed points
    pub fn pixel_length(&self) -> f64 {
        polyline_length(&self.points)
    }

    /// Check the chain can become a measurement without consuming it
    pub fn ensure_finishable(&self) -> MeasureResult<()> {
        if self.points.len() < MIN_CHAIN_POINTS {
            return Err(MeasureError::InsufficientPoints {
                required: MIN_CHAIN_POINTS,
                actual: self.points.len(),
            });
        }
        Ok(())
    }

    /// Hand over the points and reset to an empty chain
    pub fn take(&mut self) -> Vec<Point> {
        let points = std::mem::take(&mut self.points);
        self.clear();
        points
    }

    /// Discard everything, including history
    pub fn clear(&mut self) {
        self.points.clear();
        self.preview = None;
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn checkpoint(&mut self) {
        self.undo_stack.push(self.points.clone());
        self.redo_stack.clear();
    }
}
