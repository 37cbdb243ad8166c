//! Append-only JSONL event log

use std::path::{Path, PathBuf};

use alerting::{EventSink, SinkError, SuspicionEvent};
use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::StorageError;

/// Writes one JSON object per emitted event
pub struct JsonlEventLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlEventLog {
    /// Open (or create) the log for appending
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        info!("Event log: {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, event: &SuspicionEvent) -> Result<(), StorageError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl EventSink for JsonlEventLog {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn publish(&self, event: &SuspicionEvent) -> Result<(), SinkError> {
        Ok(self.append(event).await?)
    }
}
