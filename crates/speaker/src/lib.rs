//! Speaker-Count Tracker
//!
//! Counts distinct active speakers per audio chunk through an external
//! diarization oracle and raises a cooldown-limited event when more than
//! one person is talking.

pub mod config;
pub mod diarizer;
pub mod monitor;
pub mod tracker;

pub use config::{DiarizerConfig, SpeakerConfig};
pub use diarizer::{DiarizationError, DiarizationOracle, HttpDiarizer};
pub use monitor::{run_speaker_loop, SpeakerStats};
pub use tracker::{SpeakerCount, SpeakerTracker};

use thiserror::Error;

/// Speaker tracker error types
#[derive(Error, Debug)]
pub enum SpeakerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Diarizer setup failed: {0}")]
    Diarizer(String),
}
