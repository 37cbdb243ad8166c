//! Latest-event slot

use std::sync::{Arc, RwLock};

use alerting::{unix_now, EventSink, SinkError, SuspicionEvent};
use async_trait::async_trait;

/// Holds the most recently emitted event.
///
/// Readers get a whole event or the previous whole event, never a mix.
/// Last write wins across pipelines.
#[derive(Debug)]
pub struct LatestEventSlot {
    current: RwLock<Arc<SuspicionEvent>>,
}

impl LatestEventSlot {
    /// Slot holding the "System starting" placeholder
    pub fn new() -> Self {
        Self::with_event(SuspicionEvent::placeholder(unix_now()))
    }

    pub fn with_event(event: SuspicionEvent) -> Self {
        Self {
            current: RwLock::new(Arc::new(event)),
        }
    }

    pub fn store(&self, event: SuspicionEvent) {
        let event = Arc::new(event);
        match self.current.write() {
            Ok(mut guard) => *guard = event,
            Err(poisoned) => *poisoned.into_inner() = event,
        }
    }

    pub fn load(&self) -> Arc<SuspicionEvent> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}

impl Default for LatestEventSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for LatestEventSlot {
    fn name(&self) -> &str {
        "latest-event"
    }

    async fn publish(&self, event: &SuspicionEvent) -> Result<(), SinkError> {
        self.store(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_placeholder() {
        let slot = LatestEventSlot::new();
        let event = slot.load();
        assert_eq!(event.event, "System starting");
        assert_eq!(event.suspicion_score, 0.0);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let slot = LatestEventSlot::new();
        slot.publish(&SuspicionEvent::new(1.0, "Looking Left", 0.8))
            .await
            .unwrap();
        slot.publish(&SuspicionEvent::new(2.0, "Multiple Speakers Detected (2 people)", 0.95))
            .await
            .unwrap();

        let event = slot.load();
        assert_eq!(event.timestamp, 2.0);
        assert_eq!(event.suspicion_score, 0.95);
    }

    #[test]
    fn test_reader_keeps_snapshot() {
        let slot = LatestEventSlot::with_event(SuspicionEvent::normal(1.0));
        let before = slot.load();
        slot.store(SuspicionEvent::new(2.0, "Looking Up", 0.8));

        assert!(before.is_normal());
        assert_eq!(slot.load().event, "Looking Up");
    }

    #[tokio::test]
    async fn test_concurrent_writers() {
        let slot = Arc::new(LatestEventSlot::new());
        let mut tasks = Vec::new();
        for i in 0..8 {
            let slot = slot.clone();
            tasks.push(tokio::spawn(async move {
                let label = format!("writer {}", i);
                for _ in 0..50 {
                    slot.store(SuspicionEvent::new(i as f64, label.clone(), 0.8));
                    let seen = slot.load();
                    assert_eq!(seen.event, format!("writer {}", seen.timestamp as usize));
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }
}
