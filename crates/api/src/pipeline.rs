//! Pipeline wiring: event sinks and the two sampling tasks

use std::sync::Arc;

use alerting::{EventSink, FanOutSink, TracingSink};
use capture::{JsonDatagramSource, PcmChunkSource, StopSignal};
use gaze::{run_attention_loop, AttentionTracker, FacePacket, GazeError, PacketOracle};
use speaker::{run_speaker_loop, HttpDiarizer, SpeakerError, SpeakerTracker};
use storage::{EventRepository, JsonlEventLog, LatestEventSlot, SessionEventSink};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::settings::{GazeSettings, MonitorSettings, SpeakerSettings};

/// Every destination an emitted event is published to
pub struct EventSinks {
    pub latest: Arc<LatestEventSlot>,
    pub repository: Option<Arc<EventRepository>>,
    /// Fan-out over all of the above plus the console
    pub publisher: Arc<dyn EventSink>,
}

/// Open the configured sinks
pub async fn open_sinks(settings: &MonitorSettings) -> anyhow::Result<EventSinks> {
    let latest = Arc::new(LatestEventSlot::new());
    let mut fan_out = FanOutSink::new()
        .with(Arc::new(TracingSink))
        .with(latest.clone());

    if let Some(path) = &settings.storage.event_log {
        fan_out.push(Arc::new(JsonlEventLog::open(path).await?));
    }

    let repository = match &settings.storage.database_url {
        Some(url) => {
            let repo = Arc::new(EventRepository::connect(url).await?);
            fan_out.push(Arc::new(SessionEventSink::new(
                repo.clone(),
                settings.session,
                settings.storage.min_score,
            )));
            Some(repo)
        }
        None => None,
    };

    info!("Publishing events to {} sinks", fan_out.sink_count());
    Ok(EventSinks {
        latest,
        repository,
        publisher: Arc::new(fan_out),
    })
}

/// Start the attention tracker. Invalid tracker settings fail here; a feed that
/// cannot be opened only ends this task.
pub fn spawn_gaze(
    settings: &GazeSettings,
    sink: Arc<dyn EventSink>,
    stop: StopSignal,
) -> Result<JoinHandle<()>, GazeError> {
    let tracker = AttentionTracker::from_config(&settings.tracker)?;
    let oracle = PacketOracle::new(settings.tracker.mode);
    let feed = settings.feed.clone();
    let interval = settings.tracker.sample_interval();

    Ok(tokio::spawn(async move {
        let source = match JsonDatagramSource::<FacePacket>::bind(&feed).await {
            Ok(source) => source,
            Err(e) => {
                error!("Attention tracker disabled: {}", e);
                return;
            }
        };

        match run_attention_loop(source, oracle, tracker, sink, stop, interval).await {
            Ok(stats) => info!("Attention tracker finished: {:?}", stats),
            Err(e) => error!("Attention tracker stopped: {}", e),
        }
    }))
}

/// Start the speaker-count tracker
pub fn spawn_speaker(
    settings: &SpeakerSettings,
    sink: Arc<dyn EventSink>,
    stop: StopSignal,
) -> Result<JoinHandle<()>, SpeakerError> {
    let tracker = SpeakerTracker::new(&settings.tracker)?;
    let diarizer = HttpDiarizer::new(&settings.tracker.diarizer)?;
    let microphone = settings.microphone.clone();

    Ok(tokio::spawn(async move {
        let source = match PcmChunkSource::open(&microphone).await {
            Ok(source) => source,
            Err(e) => {
                error!("Speaker tracker disabled: {}", e);
                return;
            }
        };

        match run_speaker_loop(source, diarizer, tracker, sink, stop).await {
            Ok(stats) => info!("Speaker tracker finished: {:?}", stats),
            Err(e) => error!("Speaker tracker stopped: {}", e),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::SuspicionEvent;
    use capture::stop_channel;
    use std::time::Duration;

    #[tokio::test]
    async fn test_open_sinks_publishes_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = MonitorSettings::default();
        settings.storage.event_log = Some(dir.path().join("events.jsonl"));
        settings.storage.database_url = Some(format!(
            "sqlite://{}",
            dir.path().join("events.db").display()
        ));

        let sinks = open_sinks(&settings).await.unwrap();
        sinks
            .publisher
            .publish(&SuspicionEvent::new(10.0, "Looking Left", 0.8))
            .await
            .unwrap();

        assert_eq!(sinks.latest.load().event, "Looking Left");
        let repo = sinks.repository.unwrap();
        assert_eq!(repo.count(settings.session).await.unwrap(), 1);
        let log = std::fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
        assert_eq!(log.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_gaze_task_stops() {
        let mut settings = GazeSettings::default();
        settings.feed.listen_address = "127.0.0.1:0".to_string();
        let (handle, signal) = stop_channel();

        let task = spawn_gaze(&settings, Arc::new(LatestEventSlot::new()), signal).unwrap();
        handle.stop();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_invalid_gaze_settings_fail_fast() {
        let mut settings = GazeSettings::default();
        settings.tracker.suspicion_score = 2.0;
        let (_handle, signal) = stop_channel();

        assert!(spawn_gaze(&settings, Arc::new(LatestEventSlot::new()), signal).is_err());
    }

    #[tokio::test]
    async fn test_missing_microphone_ends_only_speaker_task() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = SpeakerSettings::default();
        settings.microphone.device = dir.path().join("absent.pcm").display().to_string();
        let (_handle, signal) = stop_channel();

        let task = spawn_speaker(&settings, Arc::new(LatestEventSlot::new()), signal).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_speaker_task_drains_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mic.pcm");
        std::fs::write(&path, vec![0u8; 2 * 1600 * 2]).unwrap();

        let mut settings = SpeakerSettings::default();
        settings.microphone.device = path.display().to_string();
        settings.microphone.chunk_seconds = 0.1;
        settings.tracker.diarizer.url = "http://127.0.0.1:1/diarize".to_string();
        settings.tracker.diarizer.timeout_ms = 500;
        let (_handle, signal) = stop_channel();

        let slot = Arc::new(LatestEventSlot::new());
        let task = spawn_speaker(&settings, slot.clone(), signal).unwrap();
        tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(slot.load().event, "System starting");
    }
}
