//! Proctoring Monitor Query Server
//!
//! Serves the latest suspicion event and the persisted event history to the
//! exam dashboard, and hosts both sampling pipelines.

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub mod pipeline;
mod routes;
pub mod settings;

pub use settings::{MonitorSettings, SettingsError};

use storage::{EventRepository, LatestEventSlot, SessionKey};

/// Which sampling pipelines this process runs
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PipelineFlags {
    pub gaze: bool,
    pub speaker: bool,
}

/// Application state shared across handlers
pub struct AppState {
    /// Most recent event from either pipeline
    pub latest: Arc<LatestEventSlot>,
    /// Event history, when persistence is configured
    pub repository: Option<Arc<EventRepository>>,
    /// Session the history endpoint reports on
    pub session: SessionKey,
    pub pipelines: PipelineFlags,
    /// Prometheus render handle
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(latest: Arc<LatestEventSlot>, session: SessionKey) -> Self {
        Self {
            latest,
            repository: None,
            session,
            pipelines: PipelineFlags {
                gaze: false,
                speaker: false,
            },
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_repository(mut self, repository: Arc<EventRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_pipelines(mut self, pipelines: PipelineFlags) -> Self {
        self.pipelines = pipelines;
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub pipelines: PipelineFlags,
    pub persistence: bool,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(routes::events::root))
        .route("/latest_event", get(routes::events::latest_event))
        .route("/api/v1/events", get(routes::events::list_events))
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Read-only CORS for the dashboard origins
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(_) if origin.trim() == "*" => {
                warn!("Ignoring wildcard CORS origin; credentials need explicit origins");
                None
            }
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = alerting::unix_now() as u64;

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        pipelines: state.pipelines,
        persistence: state.repository.is_some(),
    })
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Initialize logging; `RUST_LOG` overrides the configured level
pub fn init_logging(settings: &settings::LoggingSettings, verbose: bool) -> anyhow::Result<()> {
    let level = if verbose {
        tracing::level_filters::LevelFilter::DEBUG
    } else {
        settings.level.parse().unwrap_or_else(|_| {
            eprintln!("Unknown log level {:?}, using info", settings.level);
            tracing::level_filters::LevelFilter::INFO
        })
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let registry = tracing_subscriber::registry().with(filter);

    if settings.json {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()?;
    }
    Ok(())
}

/// Serve the query API until `shutdown` resolves
pub async fn run_server<F>(
    addr: &str,
    state: Arc<AppState>,
    cors_origins: &[String],
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = create_router(state, cors_origins);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting query server on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Query server stopped");
    Ok(())
}
