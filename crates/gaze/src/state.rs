//! Attention state tracking

use serde::{Deserialize, Serialize};

use crate::signal::Direction;

/// Attention state after the latest sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttentionState {
    #[default]
    Centered,
    /// Gaze outside the display band; `since` is the dwell-timer start, if armed
    LookingAway {
        direction: Direction,
        since: Option<f64>,
    },
    /// No face in the frame
    OutOfFrame,
}

impl AttentionState {
    pub fn direction(&self) -> Direction {
        match self {
            AttentionState::Centered => Direction::Centered,
            AttentionState::LookingAway { direction, .. } => *direction,
            AttentionState::OutOfFrame => Direction::OutOfFrame,
        }
    }
}

/// Start time of the current extreme-gaze run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DwellTimer {
    started_at: Option<f64>,
}

impl DwellTimer {
    /// Arm at `now` unless already running; returns the start time
    pub fn arm(&mut self, now: f64) -> f64 {
        *self.started_at.get_or_insert(now)
    }

    pub fn clear(&mut self) {
        self.started_at = None;
    }

    pub fn started_at(&self) -> Option<f64> {
        self.started_at
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Seconds since the timer was armed
    pub fn elapsed(&self, now: f64) -> Option<f64> {
        self.started_at.map(|start| now - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_keeps_first_start() {
        let mut timer = DwellTimer::default();
        assert_eq!(timer.arm(1.0), 1.0);
        assert_eq!(timer.arm(2.0), 1.0);
        assert_eq!(timer.elapsed(4.5), Some(3.5));
    }

    #[test]
    fn test_clear_unsets() {
        let mut timer = DwellTimer::default();
        timer.arm(1.0);
        timer.clear();
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed(5.0), None);
    }

    #[test]
    fn test_state_direction() {
        let away = AttentionState::LookingAway {
            direction: Direction::Up,
            since: None,
        };
        assert_eq!(away.direction(), Direction::Up);
        assert_eq!(AttentionState::OutOfFrame.direction(), Direction::OutOfFrame);
    }
}
