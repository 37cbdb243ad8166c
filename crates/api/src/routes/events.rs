//! Event Routes

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::AppState;
use alerting::{Severity, SuspicionEvent};
use chrono::{DateTime, Utc};
use storage::EventLogRecord;

const MAX_LIMIT: u32 = 100;

/// Query parameters for the events endpoint
#[derive(Debug, Deserialize)]
pub struct EventQuery {
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    10
}

/// One persisted event as shown on the dashboard
#[derive(Debug, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub record: EventLogRecord,
    pub occurred_at: Option<DateTime<Utc>>,
    pub severity: Severity,
}

impl From<EventLogRecord> for EventView {
    fn from(record: EventLogRecord) -> Self {
        Self {
            occurred_at: record.occurred_at(),
            severity: Severity::from_score(record.suspicion_score),
            record,
        }
    }
}

/// Response for the events endpoint
#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub data: Vec<EventView>,
    pub count: usize,
}

/// Liveness message
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Proctoring monitor is running" }))
}

/// Most recent event from either pipeline
pub async fn latest_event(State(state): State<Arc<AppState>>) -> Json<SuspicionEvent> {
    Json(state.latest.load().as_ref().clone())
}

/// Persisted history for the configured session, newest first
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventQuery>,
) -> Result<Json<EventListResponse>, StatusCode> {
    let Some(repository) = &state.repository else {
        return Ok(Json(EventListResponse {
            data: Vec::new(),
            count: 0,
        }));
    };

    let limit = params.limit.min(MAX_LIMIT);
    let data: Vec<EventView> = repository
        .last(state.session, limit)
        .await
        .map_err(|e| {
            warn!("Event history query failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .into_iter()
        .map(EventView::from)
        .collect();

    Ok(Json(EventListResponse {
        count: data.len(),
        data,
    }))
}
