//! SQLite event repository

use std::str::FromStr;
use std::sync::Arc;

use alerting::{normalize_epoch_seconds, EventSink, SinkError, SuspicionEvent};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::StorageError;

/// Events closer than this to an existing row of the same type are duplicates
const DUPLICATE_WINDOW_SECONDS: f64 = 1.0;

/// Student and exam an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionKey {
    pub student_id: i64,
    pub exam_id: i64,
}

impl Default for SessionKey {
    fn default() -> Self {
        Self {
            student_id: 1,
            exam_id: 1,
        }
    }
}

/// Persisted event row
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventLogRecord {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub event_type: String,
    pub suspicion_score: f64,
    /// Epoch seconds
    pub timestamp: f64,
}

impl EventLogRecord {
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt((self.timestamp * 1000.0).round() as i64)
            .single()
    }
}

/// Event history for the dashboard
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    /// Open (creating if missing) a database file, e.g. `sqlite://proctor.db`
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        info!("Event repository: {}", url);
        Self::with_pool(pool).await
    }

    /// Private in-memory database; a single pinned connection keeps it alive
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        info!("Creating in-memory event repository");
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        let repo = Self { pool };
        repo.migrate().await?;
        Ok(repo)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS event_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id INTEGER NOT NULL,
                exam_id INTEGER NOT NULL,
                event_type TEXT NOT NULL,
                suspicion_score REAL NOT NULL,
                timestamp REAL NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_event_logs_session
             ON event_logs (student_id, exam_id, timestamp)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Store the event unless it scores at or below `min_score` or repeats
    /// an event of the same type within a second. Returns whether a row was written.
    pub async fn log_if_new(
        &self,
        session: SessionKey,
        event: &SuspicionEvent,
        min_score: f64,
    ) -> Result<bool, StorageError> {
        if event.suspicion_score <= min_score {
            return Ok(false);
        }

        let at = normalize_epoch_seconds(event.timestamp);
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM event_logs
             WHERE student_id = ? AND exam_id = ? AND event_type = ?
               AND timestamp >= ? AND timestamp <= ?
             LIMIT 1",
        )
        .bind(session.student_id)
        .bind(session.exam_id)
        .bind(&event.event)
        .bind(at - DUPLICATE_WINDOW_SECONDS)
        .bind(at + DUPLICATE_WINDOW_SECONDS)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            debug!("Duplicate {} at {:.3} not logged", event.event, at);
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO event_logs (student_id, exam_id, event_type, suspicion_score, timestamp)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(session.student_id)
        .bind(session.exam_id)
        .bind(&event.event)
        .bind(event.suspicion_score)
        .bind(at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Most recent rows for the session, newest first
    pub async fn last(
        &self,
        session: SessionKey,
        take: u32,
    ) -> Result<Vec<EventLogRecord>, StorageError> {
        let rows = sqlx::query_as::<_, EventLogRecord>(
            "SELECT id, student_id, exam_id, event_type, suspicion_score, timestamp
             FROM event_logs
             WHERE student_id = ? AND exam_id = ?
             ORDER BY timestamp DESC, id DESC
             LIMIT ?",
        )
        .bind(session.student_id)
        .bind(session.exam_id)
        .bind(i64::from(take))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count(&self, session: SessionKey) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_logs WHERE student_id = ? AND exam_id = ?",
        )
        .bind(session.student_id)
        .bind(session.exam_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

/// Persists published events for one exam session
pub struct SessionEventSink {
    repo: Arc<EventRepository>,
    session: SessionKey,
    min_score: f64,
}

impl SessionEventSink {
    pub fn new(repo: Arc<EventRepository>, session: SessionKey, min_score: f64) -> Self {
        Self {
            repo,
            session,
            min_score,
        }
    }
}

#[async_trait]
impl EventSink for SessionEventSink {
    fn name(&self) -> &str {
        "event-repository"
    }

    async fn publish(&self, event: &SuspicionEvent) -> Result<(), SinkError> {
        self.repo
            .log_if_new(self.session, event, self.min_score)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: SessionKey = SessionKey {
        student_id: 7,
        exam_id: 3,
    };

    #[tokio::test]
    async fn test_low_scores_are_skipped() {
        let repo = EventRepository::in_memory().await.unwrap();

        assert!(!repo
            .log_if_new(SESSION, &SuspicionEvent::normal(100.0), 0.5)
            .await
            .unwrap());
        assert!(!repo
            .log_if_new(SESSION, &SuspicionEvent::new(100.0, "Borderline", 0.5), 0.5)
            .await
            .unwrap());
        assert_eq!(repo.count(SESSION).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_window() {
        let repo = EventRepository::in_memory().await.unwrap();
        let left = |ts| SuspicionEvent::new(ts, "Looking Left", 0.8);

        assert!(repo.log_if_new(SESSION, &left(100.0), 0.5).await.unwrap());
        assert!(!repo.log_if_new(SESSION, &left(100.8), 0.5).await.unwrap());
        assert!(!repo.log_if_new(SESSION, &left(99.0), 0.5).await.unwrap());
        assert!(repo.log_if_new(SESSION, &left(101.5), 0.5).await.unwrap());

        // Different type in the same second is kept
        let up = SuspicionEvent::new(100.2, "Looking Up", 0.8);
        assert!(repo.log_if_new(SESSION, &up, 0.5).await.unwrap());

        // Different session is independent
        let other = SessionKey {
            student_id: 8,
            exam_id: 3,
        };
        assert!(repo.log_if_new(other, &left(100.0), 0.5).await.unwrap());

        assert_eq!(repo.count(SESSION).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_millisecond_timestamps() {
        let repo = EventRepository::in_memory().await.unwrap();
        let event = SuspicionEvent::new(1_700_000_000_000.0, "Looking Down", 0.8);

        assert!(repo.log_if_new(SESSION, &event, 0.5).await.unwrap());
        let seconds = SuspicionEvent::new(1_700_000_000.5, "Looking Down", 0.8);
        assert!(!repo.log_if_new(SESSION, &seconds, 0.5).await.unwrap());

        let rows = repo.last(SESSION, 10).await.unwrap();
        assert_eq!(rows[0].timestamp, 1_700_000_000.0);
        assert_eq!(
            rows[0].occurred_at().map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[tokio::test]
    async fn test_last_newest_first() {
        let repo = EventRepository::in_memory().await.unwrap();
        for (i, label) in ["Looking Left", "Looking Right", "Looking Up"]
            .iter()
            .enumerate()
        {
            let event = SuspicionEvent::new(100.0 + 10.0 * i as f64, *label, 0.8);
            repo.log_if_new(SESSION, &event, 0.5).await.unwrap();
        }

        let rows = repo.last(SESSION, 2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].event_type, "Looking Up");
        assert_eq!(rows[1].event_type, "Looking Right");
        assert_eq!(rows[0].student_id, 7);
    }

    #[tokio::test]
    async fn test_session_sink() {
        let repo = Arc::new(EventRepository::in_memory().await.unwrap());
        let sink = SessionEventSink::new(repo.clone(), SESSION, 0.5);

        sink.publish(&SuspicionEvent::new(5.0, "Multiple Speakers Detected (2 people)", 0.95))
            .await
            .unwrap();
        sink.publish(&SuspicionEvent::normal(6.0)).await.unwrap();

        assert_eq!(repo.count(SESSION).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("events.db").display());

        let repo = EventRepository::connect(&url).await.unwrap();
        repo.log_if_new(SESSION, &SuspicionEvent::new(1.0, "Looking Left", 0.8), 0.5)
            .await
            .unwrap();
        drop(repo);

        let reopened = EventRepository::connect(&url).await.unwrap();
        assert_eq!(reopened.count(SESSION).await.unwrap(), 1);
    }
}
