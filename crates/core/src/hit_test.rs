//! Proximity hit-testing for the eraser

use crate::geometry::{nearest_vertex, Point};
use crate::measurement::{Measurement, MeasurementId, Stroke, StrokeId};

/// Something the eraser can remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EraseTarget {
    Measurement(MeasurementId),
    Stroke(StrokeId),
}

/// Closest erasable entity and how far its nearest vertex is
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EraseHit {
    pub target: EraseTarget,
    pub distance: f64,
}

/// Find the single entity whose nearest vertex is closest to `point`
///
/// Only vertices within `radius` pixels qualify. On an exact tie the earlier
/// measurement wins, then the earlier stroke.
pub fn nearest_erasable(
    measurements: &[Measurement],
    strokes: &[Stroke],
    point: Point,
    radius: f64,
) -> Option<EraseHit> {
    let measurement_hits = measurements.iter().filter_map(|m| {
        nearest_vertex(m.points(), point).map(|(_, distance)| EraseHit {
            target: EraseTarget::Measurement(m.id()),
            distance,
        })
    });
    let stroke_hits = strokes.iter().filter_map(|s| {
        nearest_vertex(s.points(), point).map(|(_, distance)| EraseHit {
            target: EraseTarget::Stroke(s.id()),
            distance,
        })
    });

    let mut best: Option<EraseHit> = None;
    for hit in measurement_hits.chain(stroke_hits) {
        if hit.distance > radius {
            continue;
        }
        match best {
            Some(current) if hit.distance >= current.distance => {}
            _ => best = Some(hit),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::MeasurementKind;
    use crate::scale::Scale;

    fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Measurement {
        Measurement::new(
            "line",
            vec![Point::new(x0, y0), Point::new(x1, y1)],
            MeasurementKind::Linear,
            &Scale::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_nearest_within_radius_wins() {
        let far = line(0.0, 0.0, 100.0, 0.0);
        let near = line(0.0, 6.0, 100.0, 6.0);
        let hit = nearest_erasable(&[far.clone(), near.clone()], &[], Point::new(1.0, 5.0), 10.0)
            .unwrap();
        assert_eq!(hit.target, EraseTarget::Measurement(near.id()));
    }

    #[test]
    fn test_outside_radius_is_ignored() {
        let m = line(0.0, 0.0, 100.0, 0.0);
        assert!(nearest_erasable(&[m], &[], Point::new(50.0, 0.0), 10.0).is_none());
    }

    #[test]
    fn test_strokes_compete_with_measurements() {
        let m = line(0.0, 0.0, 100.0, 0.0);
        let stroke = Stroke::new(vec![Point::new(3.0, 3.0), Point::new(4.0, 4.0)]);
        let hit = nearest_erasable(&[m], &[stroke.clone()], Point::new(4.0, 4.0), 10.0).unwrap();
        assert_eq!(hit.target, EraseTarget::Stroke(stroke.id()));
        assert_eq!(hit.distance, 0.0);
    }

    #[test]
    fn test_tie_prefers_earlier_measurement() {
        let first = line(0.0, 0.0, 50.0, 50.0);
        let second = line(0.0, 0.0, -50.0, -50.0);
        let hit =
            nearest_erasable(&[first.clone(), second], &[], Point::new(0.0, 0.0), 10.0).unwrap();
        assert_eq!(hit.target, EraseTarget::Measurement(first.id()));
    }
}
