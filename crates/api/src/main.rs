//! Proctoring Monitor - Main Entry Point

use std::path::PathBuf;
use std::sync::Arc;

use api::pipeline::{open_sinks, spawn_gaze, spawn_speaker};
use api::{init_logging, run_server, AppState, MonitorSettings, PipelineFlags};
use capture::stop_channel;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};

/// Exam proctoring monitor: gaze and speaker-count trackers with a query API
#[derive(Parser, Debug)]
#[command(name = "proctor-monitor", version, about, long_about = None)]
struct Args {
    /// Settings file path
    #[arg(short, long, default_value = "config/proctor.toml")]
    config: PathBuf,

    /// Query server address (overrides settings)
    #[arg(short, long)]
    bind: Option<String>,

    /// Disable the attention tracker
    #[arg(long)]
    no_gaze: bool,

    /// Disable the speaker-count tracker
    #[arg(long)]
    no_speaker: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = MonitorSettings::load(&args.config)?;
    if let Some(bind) = args.bind {
        settings.server.bind = bind;
    }
    settings.gaze.enabled &= !args.no_gaze;
    settings.speaker.enabled &= !args.no_speaker;

    init_logging(&settings.logging, args.verbose)?;

    info!("=== Proctoring Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Session: student {} exam {}",
        settings.session.student_id, settings.session.exam_id
    );

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics recorder not installed: {}", e);
            None
        }
    };

    let sinks = open_sinks(&settings).await?;
    let (stop, signal) = stop_channel();

    let mut tasks = Vec::new();
    if settings.gaze.enabled {
        tasks.push(spawn_gaze(&settings.gaze, sinks.publisher.clone(), signal.clone())?);
    }
    if settings.speaker.enabled {
        tasks.push(spawn_speaker(&settings.speaker, sinks.publisher.clone(), signal.clone())?);
    }

    let mut state = AppState::new(sinks.latest.clone(), settings.session).with_pipelines(
        PipelineFlags {
            gaze: settings.gaze.enabled,
            speaker: settings.speaker.enabled,
        },
    );
    if let Some(repository) = sinks.repository.clone() {
        state = state.with_repository(repository);
    }
    if let Some(handle) = metrics {
        state = state.with_metrics(handle);
    }

    let served = run_server(
        &settings.server.bind,
        Arc::new(state),
        &settings.server.cors_origins,
        shutdown_signal(),
    )
    .await;

    // Pipelines stop with the server, whichever way it exited
    stop.stop();

    for task in tasks {
        if let Err(e) = task.await {
            error!("Pipeline task panicked: {}", e);
        }
    }

    info!("Proctoring monitor stopped");
    served
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
