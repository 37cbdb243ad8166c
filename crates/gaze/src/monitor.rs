//! Attention sampling loop

use std::sync::Arc;
use std::time::Duration;

use alerting::{unix_now, EventSink};
use capture::{CaptureError, FrameSource, StopSignal};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::oracle::FaceOracle;
use crate::tracker::AttentionTracker;

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub frames: u64,
    pub events: u64,
    pub transient_failures: u64,
    pub oracle_failures: u64,
}

/// Run the attention tracker until `stop` fires or the source fails fatally.
///
/// The source is owned by the loop and dropped on every exit path.
/// Transient reads, oracle failures and classifier errors skip one cycle.
pub async fn run_attention_loop<S, O>(
    mut source: S,
    mut oracle: O,
    mut tracker: AttentionTracker,
    sink: Arc<dyn EventSink>,
    mut stop: StopSignal,
    sample_interval: Duration,
) -> Result<MonitorStats, CaptureError>
where
    S: FrameSource,
    O: FaceOracle<Frame = S::Frame>,
{
    let mut stats = MonitorStats::default();
    let mut ticker = tokio::time::interval(sample_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Attention monitor started");

    loop {
        if stop.is_stopped() {
            break;
        }

        let read = tokio::select! {
            _ = stop.stopped() => break,
            read = async {
                ticker.tick().await;
                source.next_frame().await
            } => read,
        };

        let frame = match read {
            Ok(frame) => frame,
            Err(e) if e.is_transient() => {
                stats.transient_failures += 1;
                metrics::counter!("proctor_transient_reads_total", "pipeline" => "gaze").increment(1);
                debug!("Skipping unreadable frame: {}", e);
                continue;
            }
            Err(e) => {
                warn!("Attention monitor source failed: {}", e);
                return Err(e);
            }
        };
        stats.frames += 1;

        let observation = match oracle.observe(&frame) {
            Ok(observation) => observation,
            Err(e) => {
                stats.oracle_failures += 1;
                metrics::counter!("proctor_oracle_failures_total", "pipeline" => "gaze").increment(1);
                trace!("Face oracle failed: {}", e);
                continue;
            }
        };

        let report = match tracker.update(observation.as_ref(), unix_now()) {
            Ok(report) => report,
            Err(e) => {
                warn!("Frame not classified: {}", e);
                continue;
            }
        };

        if let Some(event) = report.event {
            stats.events += 1;
            metrics::counter!("proctor_events_emitted_total", "pipeline" => "gaze").increment(1);
            debug!("Gaze event: {} ({:.2})", event.event, event.suspicion_score);
            if let Err(e) = sink.publish(&event).await {
                warn!("Event sink {} failed: {}", sink.name(), e);
            }
        }
    }

    info!(
        "Attention monitor stopped after {} frames, {} events",
        stats.frames, stats.events
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GazeConfig;
    use crate::oracle::{FacePacket, PacketOracle};
    use crate::signal::fixtures::face_with_iris;
    use crate::SignalMode;
    use alerting::{SinkError, SuspicionEvent};
    use async_trait::async_trait;
    use capture::stop_channel;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<SuspicionEvent>>);

    impl RecordingSink {
        fn events(&self) -> Vec<SuspicionEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn publish(&self, event: &SuspicionEvent) -> Result<(), SinkError> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    /// Replays scripted reads, then reports the device as closed.
    /// Flags `released` when dropped.
    struct ScriptedFeed {
        reads: VecDeque<Result<FacePacket, CaptureError>>,
        released: Arc<AtomicBool>,
    }

    impl Drop for ScriptedFeed {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl FrameSource for ScriptedFeed {
        type Frame = FacePacket;

        async fn next_frame(&mut self) -> Result<FacePacket, CaptureError> {
            self.reads.pop_front().unwrap_or(Err(CaptureError::Closed))
        }
    }

    /// Never yields a frame
    struct StalledFeed;

    #[async_trait]
    impl FrameSource for StalledFeed {
        type Frame = FacePacket;

        async fn next_frame(&mut self) -> Result<FacePacket, CaptureError> {
            std::future::pending().await
        }
    }

    fn no_face() -> FacePacket {
        FacePacket::default()
    }

    fn centred_face() -> FacePacket {
        FacePacket {
            face_detected: true,
            landmarks: face_with_iris((0.5, 0.45)),
            head_pose: None,
        }
    }

    fn tracker() -> AttentionTracker {
        AttentionTracker::from_config(&GazeConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_failures_do_not_end_the_loop() {
        let released = Arc::new(AtomicBool::new(false));
        let feed = ScriptedFeed {
            reads: VecDeque::from(vec![
                Err(CaptureError::Read("timeout".into())),
                Ok(FacePacket {
                    face_detected: true,
                    landmarks: vec![],
                    head_pose: None,
                }),
                Ok(no_face()),
                Ok(centred_face()),
            ]),
            released: released.clone(),
        };
        let sink = Arc::new(RecordingSink::default());
        let (_handle, signal) = stop_channel();

        let result = run_attention_loop(
            feed,
            PacketOracle::new(SignalMode::Ratio),
            tracker(),
            sink.clone(),
            signal,
            Duration::from_millis(1),
        )
        .await;

        assert!(matches!(result, Err(CaptureError::Closed)));
        assert!(released.load(Ordering::SeqCst));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "Face Out Of Frame");
        assert!(events[1].is_normal());
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let (handle, signal) = stop_channel();
        handle.stop();

        let stats = run_attention_loop(
            StalledFeed,
            PacketOracle::new(SignalMode::Ratio),
            tracker(),
            Arc::new(RecordingSink::default()),
            signal,
            Duration::from_millis(1),
        )
        .await
        .unwrap();

        assert_eq!(stats, MonitorStats::default());
    }

    #[tokio::test]
    async fn test_stop_interrupts_stalled_read() {
        let (handle, signal) = stop_channel();
        let task = tokio::spawn(run_attention_loop(
            StalledFeed,
            PacketOracle::new(SignalMode::Ratio),
            tracker(),
            Arc::new(RecordingSink::default()),
            signal,
            Duration::from_millis(1),
        ));

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.stop();

        let stats = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(stats.frames, 0);
    }
}
