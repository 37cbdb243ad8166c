//! Attention tracker state machine

use std::time::Duration;

use alerting::{Cooldown, SuspicionEvent};
use tracing::{debug, info};

use crate::classifier::{DirectionClassifier, HeadPoseClassifier, HysteresisClassifier};
use crate::config::{GazeConfig, SignalMode};
use crate::signal::{Direction, FrameSignal};
use crate::state::{AttentionState, DwellTimer};
use crate::GazeError;

/// Outcome of one sampling tick
#[derive(Debug, Clone, PartialEq)]
pub struct AttentionReport {
    pub state: AttentionState,
    /// Label-level direction for display
    pub direction: Direction,
    /// Debounced verdict for this tick, before rate limiting
    pub suspicious: bool,
    /// Event emitted on this tick, if any
    pub event: Option<SuspicionEvent>,
}

/// Converts classified samples into debounced, rate-limited events
pub struct AttentionTracker {
    classifier: Box<dyn DirectionClassifier>,
    dwell_threshold: f64,
    suspicion_score: f64,
    state: AttentionState,
    dwell: DwellTimer,
    cooldown: Cooldown,
    last_emitted_normal: bool,
}

impl AttentionTracker {
    pub fn new(
        classifier: Box<dyn DirectionClassifier>,
        dwell: Duration,
        cooldown: Duration,
        suspicion_score: f64,
    ) -> Self {
        Self {
            classifier,
            dwell_threshold: dwell.as_secs_f64(),
            suspicion_score,
            state: AttentionState::default(),
            dwell: DwellTimer::default(),
            cooldown: Cooldown::new(cooldown),
            last_emitted_normal: false,
        }
    }

    /// Build a tracker with the classifier matching the configured mode
    pub fn from_config(config: &GazeConfig) -> Result<Self, GazeError> {
        config.validate()?;

        let classifier: Box<dyn DirectionClassifier> = match config.mode {
            SignalMode::Ratio => Box::new(HysteresisClassifier::new(config.thresholds)?),
            SignalMode::HeadPose => Box::new(HeadPoseClassifier::new(config.angle_thresholds)?),
        };

        info!(
            "Attention tracker: mode {:?}, dwell {:.1}s, cooldown {:.1}s",
            config.mode, config.dwell_seconds, config.cooldown_seconds
        );
        Ok(Self::new(
            classifier,
            config.dwell(),
            config.cooldown(),
            config.suspicion_score,
        ))
    }

    /// Feed one sample taken at `now` (epoch seconds); `None` means no face.
    ///
    /// A classifier error leaves the tracker untouched.
    pub fn update(
        &mut self,
        observation: Option<&FrameSignal>,
        now: f64,
    ) -> Result<AttentionReport, GazeError> {
        let suspicious = match observation {
            None => {
                self.dwell.clear();
                self.state = AttentionState::OutOfFrame;
                true
            }
            Some(signal) => {
                let classification = self.classifier.classify(signal)?;

                let suspicious = if classification.is_extreme {
                    let since = self.dwell.arm(now);
                    !self.classifier.debounced() || now - since >= self.dwell_threshold
                } else {
                    self.dwell.clear();
                    false
                };

                self.state = if classification.direction.is_centered() {
                    AttentionState::Centered
                } else {
                    AttentionState::LookingAway {
                        direction: classification.direction,
                        since: self.dwell.started_at(),
                    }
                };
                suspicious
            }
        };

        let direction = self.state.direction();
        let event = self.emit(direction, suspicious, now);

        Ok(AttentionReport {
            state: self.state,
            direction,
            suspicious,
            event,
        })
    }

    fn emit(&mut self, direction: Direction, suspicious: bool, now: f64) -> Option<SuspicionEvent> {
        if suspicious {
            if !self.cooldown.is_ready(now) {
                return None;
            }
            self.cooldown.record_fire(now);
            self.last_emitted_normal = false;
            debug!("Suspicious: {}", direction.label());
            return Some(SuspicionEvent::new(now, direction.label(), self.suspicion_score));
        }

        if direction.is_centered() && !self.last_emitted_normal {
            self.cooldown.record_fire(now);
            self.last_emitted_normal = true;
            debug!("Attention back to normal");
            return Some(SuspicionEvent::normal(now));
        }

        None
    }

    pub fn state(&self) -> &AttentionState {
        &self.state
    }

    pub fn dwell_timer(&self) -> &DwellTimer {
        &self.dwell
    }
}
