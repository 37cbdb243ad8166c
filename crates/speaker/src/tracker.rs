//! Multi-speaker debounce

use std::collections::BTreeSet;

use alerting::{Cooldown, SuspicionEvent};
use tracing::debug;

use crate::config::SpeakerConfig;
use crate::SpeakerError;

/// Number of distinct speaker labels active within one chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpeakerCount(pub usize);

impl SpeakerCount {
    /// Count distinct labels; repeated labels (several segments of one speaker) count once
    pub fn from_labels<I, L>(labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        let distinct: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Self(distinct.len())
    }

    pub fn is_multiple(&self) -> bool {
        self.0 > 1
    }
}

/// Stateless per chunk apart from the emission watermark
#[derive(Debug, Clone)]
pub struct SpeakerTracker {
    cooldown: Cooldown,
    suspicion_score: f64,
}

impl SpeakerTracker {
    pub fn new(config: &SpeakerConfig) -> Result<Self, SpeakerError> {
        config.validate()?;
        Ok(Self {
            cooldown: Cooldown::new(config.cooldown()),
            suspicion_score: config.suspicion_score,
        })
    }

    /// Feed the speaker count of one chunk analysed at `now` (epoch seconds)
    pub fn observe(&mut self, count: SpeakerCount, now: f64) -> Option<SuspicionEvent> {
        if !count.is_multiple() {
            return None;
        }
        if !self.cooldown.is_ready(now) {
            debug!("Multiple speakers ({}) within cooldown", count.0);
            return None;
        }

        self.cooldown.record_fire(now);
        Some(SuspicionEvent::new(
            now,
            format!("Multiple Speakers Detected ({} people)", count.0),
            self.suspicion_score,
        ))
    }

    pub fn last_event_time(&self) -> Option<f64> {
        self.cooldown.last_fired()
    }
}
