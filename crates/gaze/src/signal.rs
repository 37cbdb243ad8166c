//! Frame signals, directions, and eye landmark geometry

use serde::{Deserialize, Serialize};

/// Per-frame gaze measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSignal {
    /// Normalised iris displacement in [0, 1], 0.5 = centred
    Ratios { horizontal: f64, vertical: f64 },
    /// Head angles in degrees, 0 = facing the camera
    Angles { yaw: f64, pitch: f64, roll: f64 },
}

impl FrameSignal {
    pub fn kind(&self) -> &'static str {
        match self {
            FrameSignal::Ratios { .. } => "ratio",
            FrameSignal::Angles { .. } => "angle",
        }
    }
}

/// Classified gaze direction.
///
/// Left/Right are in the subject's frame: the feed is mirrored before
/// measurement, so a low horizontal ratio means the subject looks right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Centered,
    Left,
    Right,
    Up,
    Down,
    OutOfFrame,
}

impl Direction {
    /// Event label for this direction
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Centered => "Looking Center",
            Direction::Left => "Looking Left",
            Direction::Right => "Looking Right",
            Direction::Up => "Looking Up",
            Direction::Down => "Looking Down",
            Direction::OutOfFrame => "Face Out Of Frame",
        }
    }

    pub fn is_centered(&self) -> bool {
        matches!(self, Direction::Centered)
    }
}

// MediaPipe FaceMesh indices (refined landmarks, 478 points)
const LEFT_EYE_OUTER: usize = 33;
const LEFT_EYE_INNER: usize = 133;
const LEFT_EYE_TOP: usize = 159;
const LEFT_EYE_BOTTOM: usize = 145;
const RIGHT_EYE_INNER: usize = 362;
const RIGHT_EYE_OUTER: usize = 263;
const RIGHT_EYE_TOP: usize = 386;
const RIGHT_EYE_BOTTOM: usize = 374;
const LEFT_IRIS: usize = 473;
const RIGHT_IRIS: usize = 468;

/// Landmarks needed by `gaze_ratios`
pub const REQUIRED_LANDMARKS: usize = LEFT_IRIS + 1;

/// Displacement over extent; a degenerate extent is treated as centred.
fn safe_ratio(offset: f64, extent: f64) -> f64 {
    if extent == 0.0 {
        0.5
    } else {
        offset / extent
    }
}

/// Average horizontal and vertical iris ratios over both eyes.
///
/// Returns `None` when fewer than `REQUIRED_LANDMARKS` points are given.
pub fn gaze_ratios(landmarks: &[[f64; 3]]) -> Option<FrameSignal> {
    if landmarks.len() < REQUIRED_LANDMARKS {
        return None;
    }
    let x = |i: usize| landmarks[i][0];
    let y = |i: usize| landmarks[i][1];

    let left_h = safe_ratio(
        x(LEFT_IRIS) - x(LEFT_EYE_OUTER),
        x(LEFT_EYE_INNER) - x(LEFT_EYE_OUTER),
    );
    let right_h = safe_ratio(
        x(RIGHT_IRIS) - x(RIGHT_EYE_INNER),
        x(RIGHT_EYE_OUTER) - x(RIGHT_EYE_INNER),
    );

    let left_v = safe_ratio(
        y(LEFT_IRIS) - y(LEFT_EYE_TOP),
        y(LEFT_EYE_BOTTOM) - y(LEFT_EYE_TOP),
    );
    let right_v = safe_ratio(
        y(RIGHT_IRIS) - y(RIGHT_EYE_TOP),
        y(RIGHT_EYE_BOTTOM) - y(RIGHT_EYE_TOP),
    );

    Some(FrameSignal::Ratios {
        horizontal: (left_h + right_h) / 2.0,
        vertical: (left_v + right_v) / 2.0,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Face with both eyes spanning x 0.4..0.6 / y 0.4..0.5 and irises at `iris`
    pub(crate) fn face_with_iris(iris: (f64, f64)) -> Vec<[f64; 3]> {
        let mut points = vec![[0.5, 0.5, 0.0]; REQUIRED_LANDMARKS];
        for (near, far) in [(LEFT_EYE_OUTER, LEFT_EYE_INNER), (RIGHT_EYE_INNER, RIGHT_EYE_OUTER)] {
            points[near][0] = 0.4;
            points[far][0] = 0.6;
        }
        for (top, bottom) in [(LEFT_EYE_TOP, LEFT_EYE_BOTTOM), (RIGHT_EYE_TOP, RIGHT_EYE_BOTTOM)] {
            points[top][1] = 0.4;
            points[bottom][1] = 0.5;
        }
        for iris_idx in [LEFT_IRIS, RIGHT_IRIS] {
            points[iris_idx][0] = iris.0;
            points[iris_idx][1] = iris.1;
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::face_with_iris;
    use super::*;
    use crate::classifier::{classify_ratios, ThresholdSet};

    fn ratios(signal: FrameSignal) -> (f64, f64) {
        match signal {
            FrameSignal::Ratios { horizontal, vertical } => (horizontal, vertical),
            other => panic!("unexpected signal {:?}", other),
        }
    }

    #[test]
    fn test_centred_iris() {
        let (h, v) = ratios(gaze_ratios(&face_with_iris((0.5, 0.45))).unwrap());
        assert!((h - 0.5).abs() < 1e-9);
        assert!((v - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_iris_near_outer_corner() {
        let (h, _) = ratios(gaze_ratios(&face_with_iris((0.45, 0.45))).unwrap());
        assert!((h - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_zero_width_eye_is_neutral() {
        let mut points = face_with_iris((0.9, 0.9));
        for idx in [LEFT_EYE_OUTER, LEFT_EYE_INNER, RIGHT_EYE_INNER, RIGHT_EYE_OUTER] {
            points[idx][0] = 0.5;
        }
        for idx in [LEFT_EYE_TOP, LEFT_EYE_BOTTOM, RIGHT_EYE_TOP, RIGHT_EYE_BOTTOM] {
            points[idx][1] = 0.5;
        }

        let (h, v) = ratios(gaze_ratios(&points).unwrap());
        assert_eq!(h, 0.5);
        assert_eq!(v, 0.5);

        let classification = classify_ratios(h, v, &ThresholdSet::default());
        assert_eq!(classification.direction, Direction::Centered);
        assert!(!classification.is_extreme);
    }

    #[test]
    fn test_too_few_landmarks() {
        assert!(gaze_ratios(&vec![[0.0; 3]; 468]).is_none());
    }

    #[test]
    fn test_labels() {
        assert_eq!(Direction::Right.label(), "Looking Right");
        assert_eq!(Direction::OutOfFrame.label(), "Face Out Of Frame");
        assert!(Direction::Centered.is_centered());
    }
}
