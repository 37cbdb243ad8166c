//! Speaker tracker configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::SpeakerError;

/// Diarization service endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiarizerConfig {
    /// URL accepting `{sample_rate, samples}` and answering `{speakers}`
    pub url: String,
    /// Per-request timeout (milliseconds)
    pub timeout_ms: u64,
}

impl Default for DiarizerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8001/diarize".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Speaker tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerConfig {
    /// Minimum spacing between multi-speaker events (seconds)
    pub cooldown_seconds: f64,
    /// Score attached to multi-speaker events
    pub suspicion_score: f64,
    pub diarizer: DiarizerConfig,
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 10.0,
            suspicion_score: 0.95,
            diarizer: DiarizerConfig::default(),
        }
    }
}

impl SpeakerConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_seconds.max(0.0))
    }

    pub fn validate(&self) -> Result<(), SpeakerError> {
        if !(0.0..=1.0).contains(&self.suspicion_score) {
            return Err(SpeakerError::Config(format!(
                "suspicion_score {} outside [0, 1]",
                self.suspicion_score
            )));
        }
        if !self.cooldown_seconds.is_finite() || self.cooldown_seconds < 0.0 {
            return Err(SpeakerError::Config("cooldown_seconds must be >= 0".into()));
        }
        Ok(())
    }
}
