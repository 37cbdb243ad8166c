//! Storage Layer
//!
//! Event sinks behind the query server:
//! - Latest-event slot (single writer per pipeline, many readers)
//! - Append-only JSONL event log
//! - SQLite event repository keyed by exam session

mod jsonl;
mod repository;
mod slot;

pub use jsonl::JsonlEventLog;
pub use repository::{EventLogRecord, EventRepository, SessionEventSink, SessionKey};
pub use slot::LatestEventSlot;

use alerting::SinkError;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<StorageError> for SinkError {
    fn from(e: StorageError) -> Self {
        SinkError::Storage(e.to_string())
    }
}
