//! Speaker sampling loop

use std::sync::Arc;

use alerting::{unix_now, EventSink};
use capture::{AudioSource, CaptureError, StopSignal};
use tracing::{debug, info, trace, warn};

use crate::diarizer::DiarizationOracle;
use crate::tracker::{SpeakerCount, SpeakerTracker};

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpeakerStats {
    pub chunks: u64,
    pub events: u64,
    pub transient_failures: u64,
    pub oracle_failures: u64,
}

/// Run the speaker tracker until `stop` fires or the microphone fails fatally.
///
/// Diarizer failures are swallowed so a flaky service never stops the loop.
pub async fn run_speaker_loop<S, D>(
    mut source: S,
    diarizer: D,
    mut tracker: SpeakerTracker,
    sink: Arc<dyn EventSink>,
    mut stop: StopSignal,
) -> Result<SpeakerStats, CaptureError>
where
    S: AudioSource,
    D: DiarizationOracle,
{
    let mut stats = SpeakerStats::default();

    info!("Speaker monitor started");

    loop {
        if stop.is_stopped() {
            break;
        }

        let read = tokio::select! {
            _ = stop.stopped() => break,
            read = source.next_chunk() => read,
        };

        let chunk = match read {
            Ok(chunk) => chunk,
            Err(e) if e.is_transient() => {
                stats.transient_failures += 1;
                metrics::counter!("proctor_transient_reads_total", "pipeline" => "speaker").increment(1);
                debug!("Skipping unreadable audio chunk: {}", e);
                continue;
            }
            Err(e) => {
                warn!("Speaker monitor source failed: {}", e);
                return Err(e);
            }
        };
        stats.chunks += 1;

        let labels = tokio::select! {
            _ = stop.stopped() => break,
            labels = diarizer.speakers(&chunk) => labels,
        };
        let labels = match labels {
            Ok(labels) => labels,
            Err(e) => {
                stats.oracle_failures += 1;
                metrics::counter!("proctor_oracle_failures_total", "pipeline" => "speaker").increment(1);
                trace!("Diarization failed: {}", e);
                continue;
            }
        };

        let count = SpeakerCount::from_labels(labels);
        trace!("{} speaker(s) in {:.1}s chunk", count.0, chunk.duration_seconds());

        if let Some(event) = tracker.observe(count, unix_now()) {
            stats.events += 1;
            metrics::counter!("proctor_events_emitted_total", "pipeline" => "speaker").increment(1);
            debug!("Speaker event: {} ({:.2})", event.event, event.suspicion_score);
            if let Err(e) = sink.publish(&event).await {
                warn!("Event sink {} failed: {}", sink.name(), e);
            }
        }
    }

    info!(
        "Speaker monitor stopped after {} chunks, {} events",
        stats.chunks, stats.events
    );
    Ok(stats)
}
