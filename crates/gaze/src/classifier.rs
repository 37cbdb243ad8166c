//! Direction classification
//!
//! Pure functions from a frame signal to a `Classification`. The ratio
//! classifier uses two bands per axis: the tighter *display* band decides
//! the reported direction, the looser *suspicion* band decides whether the
//! sample counts toward the dwell timer.

use serde::{Deserialize, Serialize};

use crate::signal::{Direction, FrameSignal};
use crate::GazeError;

/// Closed interval `[lower, upper]`; values strictly outside it are out of band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub lower: f64,
    pub upper: f64,
}

impl Band {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn is_below(&self, value: f64) -> bool {
        value < self.lower
    }

    pub fn is_above(&self, value: f64) -> bool {
        value > self.upper
    }

    pub fn is_outside(&self, value: f64) -> bool {
        self.is_below(value) || self.is_above(value)
    }

    /// Whether `other` lies entirely within this band
    pub fn contains_band(&self, other: &Band) -> bool {
        self.lower <= other.lower && self.upper >= other.upper
    }

    fn is_valid(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite() && self.lower < self.upper
    }
}

/// Display and suspicion bands for both ratio axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    pub display_horizontal: Band,
    pub display_vertical: Band,
    pub suspicion_horizontal: Band,
    pub suspicion_vertical: Band,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self::single_band(Band::new(0.30, 0.56), Band::new(0.32, 0.55))
    }
}

impl ThresholdSet {
    /// Suspicion bands equal to the display bands
    pub fn single_band(horizontal: Band, vertical: Band) -> Self {
        Self {
            display_horizontal: horizontal,
            display_vertical: vertical,
            suspicion_horizontal: horizontal,
            suspicion_vertical: vertical,
        }
    }

    /// Wider 0.35/0.65 bands on both axes
    pub fn relaxed() -> Self {
        Self::single_band(Band::new(0.35, 0.65), Band::new(0.35, 0.65))
    }

    /// Replace the suspicion bands, keeping the display bands
    pub fn with_suspicion(self, horizontal: Band, vertical: Band) -> Self {
        Self {
            suspicion_horizontal: horizontal,
            suspicion_vertical: vertical,
            ..self
        }
    }

    /// Every band non-empty and each suspicion band containing its display band
    pub fn validate(&self) -> Result<(), GazeError> {
        let bands = [
            ("display_horizontal", &self.display_horizontal),
            ("display_vertical", &self.display_vertical),
            ("suspicion_horizontal", &self.suspicion_horizontal),
            ("suspicion_vertical", &self.suspicion_vertical),
        ];
        for (name, band) in bands {
            if !band.is_valid() {
                return Err(GazeError::InvalidThresholds(format!(
                    "{} [{}, {}] is empty",
                    name, band.lower, band.upper
                )));
            }
        }
        if !self.suspicion_horizontal.contains_band(&self.display_horizontal) {
            return Err(GazeError::InvalidThresholds(
                "suspicion_horizontal must contain display_horizontal".into(),
            ));
        }
        if !self.suspicion_vertical.contains_band(&self.display_vertical) {
            return Err(GazeError::InvalidThresholds(
                "suspicion_vertical must contain display_vertical".into(),
            ));
        }
        Ok(())
    }
}

/// Head-pose thresholds (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleThresholds {
    pub yaw_degrees: f64,
    pub pitch_degrees: f64,
}

impl Default for AngleThresholds {
    fn default() -> Self {
        Self {
            yaw_degrees: 10.0,
            pitch_degrees: 10.0,
        }
    }
}

impl AngleThresholds {
    pub fn validate(&self) -> Result<(), GazeError> {
        if self.yaw_degrees > 0.0 && self.pitch_degrees > 0.0 {
            Ok(())
        } else {
            Err(GazeError::InvalidThresholds(
                "angle thresholds must be positive".into(),
            ))
        }
    }
}

/// Result of classifying one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub direction: Direction,
    /// Sample is outside the suspicion band and counts toward the dwell timer
    pub is_extreme: bool,
}

/// Classify gaze ratios against display and suspicion bands.
///
/// Horizontal is checked before vertical. The feed is mirrored, so a low
/// horizontal ratio maps to `Right`.
pub fn classify_ratios(horizontal: f64, vertical: f64, thresholds: &ThresholdSet) -> Classification {
    let display_h = &thresholds.display_horizontal;
    let display_v = &thresholds.display_vertical;

    let direction = if display_h.is_below(horizontal) {
        Direction::Right
    } else if display_h.is_above(horizontal) {
        Direction::Left
    } else if display_v.is_below(vertical) {
        Direction::Up
    } else if display_v.is_above(vertical) {
        Direction::Down
    } else {
        Direction::Centered
    };

    let is_extreme = thresholds.suspicion_horizontal.is_outside(horizontal)
        || thresholds.suspicion_vertical.is_outside(vertical);

    Classification {
        direction,
        is_extreme,
    }
}

/// Classify head-pose angles: yaw first, then pitch, single threshold each
pub fn classify_angles(yaw: f64, pitch: f64, thresholds: &AngleThresholds) -> Classification {
    let direction = if yaw > thresholds.yaw_degrees {
        Direction::Left
    } else if yaw < -thresholds.yaw_degrees {
        Direction::Right
    } else if pitch > thresholds.pitch_degrees {
        Direction::Down
    } else if pitch < -thresholds.pitch_degrees {
        Direction::Up
    } else {
        Direction::Centered
    };

    Classification {
        direction,
        is_extreme: !direction.is_centered(),
    }
}

/// Signal-to-direction strategy plugged into the attention tracker
pub trait DirectionClassifier: Send + Sync {
    fn classify(&self, signal: &FrameSignal) -> Result<Classification, GazeError>;

    /// Whether extreme samples must dwell before they become suspicious
    fn debounced(&self) -> bool {
        true
    }
}

/// Dual-band ratio classifier (canonical mode)
#[derive(Debug, Clone)]
pub struct HysteresisClassifier {
    thresholds: ThresholdSet,
}

impl HysteresisClassifier {
    pub fn new(thresholds: ThresholdSet) -> Result<Self, GazeError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }
}

impl DirectionClassifier for HysteresisClassifier {
    fn classify(&self, signal: &FrameSignal) -> Result<Classification, GazeError> {
        match *signal {
            FrameSignal::Ratios {
                horizontal,
                vertical,
            } => Ok(classify_ratios(horizontal, vertical, &self.thresholds)),
            other => Err(GazeError::SignalMismatch {
                expected: "ratio",
                got: other.kind(),
            }),
        }
    }
}

/// Head-pose classifier (degraded mode, no dwell)
#[derive(Debug, Clone)]
pub struct HeadPoseClassifier {
    thresholds: AngleThresholds,
}

impl HeadPoseClassifier {
    pub fn new(thresholds: AngleThresholds) -> Result<Self, GazeError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }
}

impl DirectionClassifier for HeadPoseClassifier {
    fn classify(&self, signal: &FrameSignal) -> Result<Classification, GazeError> {
        match *signal {
            FrameSignal::Angles { yaw, pitch, .. } => {
                Ok(classify_angles(yaw, pitch, &self.thresholds))
            }
            other => Err(GazeError::SignalMismatch {
                expected: "angle",
                got: other.kind(),
            }),
        }
    }

    fn debounced(&self) -> bool {
        false
    }
}
