//! Suspicion event record

use serde::{Deserialize, Serialize};

/// Label of the recovery event that closes an incident
pub const NORMAL_LABEL: &str = "NORMAL";

const PLACEHOLDER_LABEL: &str = "System starting";

/// Current wall-clock time as epoch seconds
pub fn unix_now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Accept epoch timestamps in seconds or milliseconds, return seconds
pub fn normalize_epoch_seconds(ts: f64) -> f64 {
    if ts > 1e12 {
        ts / 1000.0
    } else {
        ts
    }
}

/// One emitted suspicion verdict (or recovery)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspicionEvent {
    /// Emission time (epoch seconds)
    pub timestamp: f64,
    /// Human-readable label, e.g. "Looking Left" or "NORMAL"
    pub event: String,
    /// Score in [0, 1]
    pub suspicion_score: f64,
}

impl SuspicionEvent {
    pub fn new(timestamp: f64, event: impl Into<String>, suspicion_score: f64) -> Self {
        Self {
            timestamp,
            event: event.into(),
            suspicion_score: suspicion_score.clamp(0.0, 1.0),
        }
    }

    /// Recovery event with score 0.0
    pub fn normal(timestamp: f64) -> Self {
        Self::new(timestamp, NORMAL_LABEL, 0.0)
    }

    /// Startup value of the latest-event slot
    pub fn placeholder(timestamp: f64) -> Self {
        Self::new(timestamp, PLACEHOLDER_LABEL, 0.0)
    }

    pub fn is_normal(&self) -> bool {
        self.event == NORMAL_LABEL
    }

    pub fn severity(&self) -> Severity {
        Severity::from_score(self.suspicion_score)
    }
}

/// Severity band derived from the suspicion score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Severity::High
        } else if score >= 0.75 {
            Severity::Medium
        } else if score > 0.0 {
            Severity::Low
        } else {
            Severity::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let event = SuspicionEvent::new(1_700_000_000.5, "Looking Left", 0.8);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["timestamp"], 1_700_000_000.5);
        assert_eq!(json["event"], "Looking Left");
        assert_eq!(json["suspicion_score"], 0.8);
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(SuspicionEvent::new(0.0, "x", 1.7).suspicion_score, 1.0);
        assert_eq!(SuspicionEvent::new(0.0, "x", -0.2).suspicion_score, 0.0);
    }

    #[test]
    fn test_millisecond_timestamps_normalised() {
        assert_eq!(normalize_epoch_seconds(1_700_000_000_000.0), 1_700_000_000.0);
        assert_eq!(normalize_epoch_seconds(1_700_000_000.0), 1_700_000_000.0);
    }

    #[test]
    fn test_severity_levels() {
        assert_eq!(Severity::from_score(0.95), Severity::High);
        assert_eq!(Severity::from_score(0.8), Severity::Medium);
        assert_eq!(Severity::from_score(0.3), Severity::Low);
        assert_eq!(Severity::from_score(0.0), Severity::None);
        assert_eq!(SuspicionEvent::normal(1.0).severity(), Severity::None);
    }

    #[test]
    fn test_normal_and_placeholder() {
        assert!(SuspicionEvent::normal(1.0).is_normal());
        let placeholder = SuspicionEvent::placeholder(1.0);
        assert!(!placeholder.is_normal());
        assert_eq!(placeholder.suspicion_score, 0.0);
    }
}
