//! Attention tracker configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::classifier::{AngleThresholds, ThresholdSet};
use crate::GazeError;

/// Which signal representation a deployment feeds the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalMode {
    /// Iris/eye-corner ratios with dual-band hysteresis and dwell
    #[default]
    Ratio,
    /// Head-pose angles, single threshold, no dwell
    HeadPose,
}

/// Attention tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Signal representation
    pub mode: SignalMode,

    /// Ratio bands (ratio mode)
    pub thresholds: ThresholdSet,

    /// Angle thresholds (head-pose mode)
    pub angle_thresholds: AngleThresholds,

    /// Continuous extreme gaze needed before a verdict (seconds)
    pub dwell_seconds: f64,

    /// Minimum spacing between emitted events (seconds)
    pub cooldown_seconds: f64,

    /// Score attached to looking-away and out-of-frame events
    pub suspicion_score: f64,

    /// Sampling loop period (milliseconds)
    pub sample_interval_ms: u64,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            mode: SignalMode::Ratio,
            thresholds: ThresholdSet::default(),
            angle_thresholds: AngleThresholds::default(),
            dwell_seconds: 3.5,
            cooldown_seconds: 5.0,
            suspicion_score: 0.8,
            sample_interval_ms: 10,
        }
    }
}

impl GazeConfig {
    /// Head-pose deployment (angles only, no iris landmarks)
    pub fn head_pose() -> Self {
        Self {
            mode: SignalMode::HeadPose,
            cooldown_seconds: 10.0,
            ..Default::default()
        }
    }

    /// Ratio deployment with the wider 0.35/0.65 bands
    pub fn relaxed() -> Self {
        Self {
            thresholds: ThresholdSet::relaxed(),
            cooldown_seconds: 10.0,
            ..Default::default()
        }
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_secs_f64(self.dwell_seconds.max(0.0))
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_seconds.max(0.0))
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }

    pub fn validate(&self) -> Result<(), GazeError> {
        if !(0.0..=1.0).contains(&self.suspicion_score) {
            return Err(GazeError::Config(format!(
                "suspicion_score {} outside [0, 1]",
                self.suspicion_score
            )));
        }
        if !self.dwell_seconds.is_finite() || self.dwell_seconds < 0.0 {
            return Err(GazeError::Config("dwell_seconds must be >= 0".into()));
        }
        if !self.cooldown_seconds.is_finite() || self.cooldown_seconds < 0.0 {
            return Err(GazeError::Config("cooldown_seconds must be >= 0".into()));
        }
        match self.mode {
            SignalMode::Ratio => self.thresholds.validate(),
            SignalMode::HeadPose => self.angle_thresholds.validate(),
        }
    }
}
