//! Event sink seam

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::SuspicionEvent;

/// Event sink errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Consumer of emitted events. Owned by the host process, shared with the trackers.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn publish(&self, event: &SuspicionEvent) -> Result<(), SinkError>;
}

/// Writes each event to the tracing log
#[derive(Debug, Default)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn publish(&self, event: &SuspicionEvent) -> Result<(), SinkError> {
        info!(
            event = %event.event,
            score = event.suspicion_score,
            severity = ?event.severity(),
            timestamp = event.timestamp,
            "Suspicion event"
        );
        Ok(())
    }
}

/// Publishes to every registered sink; one failing sink never blocks the others
#[derive(Default, Clone)]
pub struct FanOutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

#[async_trait]
impl EventSink for FanOutSink {
    fn name(&self) -> &str {
        "fan-out"
    }

    async fn publish(&self, event: &SuspicionEvent) -> Result<(), SinkError> {
        for sink in &self.sinks {
            if let Err(e) = sink.publish(event).await {
                warn!("Sink {} rejected event {}: {}", sink.name(), event.event, e);
            }
        }
        Ok(())
    }
}
