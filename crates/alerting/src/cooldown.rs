//! Emission cooldown watermark

use std::time::Duration;

use tracing::trace;

/// Rate limiter keyed on the time of the last emitted event.
///
/// An emission is allowed when strictly more than `period` has passed
/// since the last one, or when nothing has been emitted yet.
#[derive(Debug, Clone)]
pub struct Cooldown {
    period: f64,
    last_fired: Option<f64>,
}

impl Cooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.as_secs_f64(),
            last_fired: None,
        }
    }

    pub fn from_secs_f64(period: f64) -> Self {
        Self::new(Duration::from_secs_f64(period.max(0.0)))
    }

    /// Whether an emission at `now` would pass the cooldown
    pub fn is_ready(&self, now: f64) -> bool {
        match self.last_fired {
            None => true,
            Some(last) => {
                let ready = now - last > self.period;
                if !ready {
                    trace!("Emission suppressed: {:.2}s since last event", now - last);
                }
                ready
            }
        }
    }

    /// Record an emission at `now`
    pub fn record_fire(&mut self, now: f64) {
        self.last_fired = Some(now);
    }

    pub fn last_fired(&self) -> Option<f64> {
        self.last_fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_emission_is_ready() {
        let cooldown = Cooldown::from_secs_f64(10.0);
        assert!(cooldown.is_ready(0.0));
    }

    #[test]
    fn test_deduplication_window() {
        let mut cooldown = Cooldown::from_secs_f64(10.0);
        cooldown.record_fire(100.0);

        assert!(!cooldown.is_ready(105.0));
        assert!(!cooldown.is_ready(110.0));
        assert!(cooldown.is_ready(110.5));
    }

    #[test]
    fn test_suppressed_checks_keep_watermark() {
        let mut cooldown = Cooldown::from_secs_f64(5.0);
        cooldown.record_fire(1.0);
        for i in 0..100 {
            assert!(!cooldown.is_ready(1.0 + i as f64 * 0.01));
        }

        assert_eq!(cooldown.last_fired(), Some(1.0));
        assert!(cooldown.is_ready(6.5));
    }
}
