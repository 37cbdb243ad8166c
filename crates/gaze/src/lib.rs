//! Attention Tracker
//!
//! Turns per-frame gaze measurements into debounced suspicion events:
//! - Iris/eye-corner ratios or head-pose angles as input signal
//! - Dual-band (display / suspicion) direction classification
//! - Dwell timer before a looking-away verdict
//! - Immediate verdict when the face leaves the frame
//! - Cooldown-limited emission and a single NORMAL on recovery

pub mod classifier;
pub mod config;
pub mod monitor;
pub mod oracle;
pub mod signal;
pub mod state;
pub mod tracker;

pub use classifier::{
    classify_angles, classify_ratios, AngleThresholds, Band, Classification, DirectionClassifier,
    HeadPoseClassifier, HysteresisClassifier, ThresholdSet,
};
pub use config::{GazeConfig, SignalMode};
pub use monitor::{run_attention_loop, MonitorStats};
pub use oracle::{FaceOracle, FacePacket, HeadPose, OracleError, PacketOracle};
pub use signal::{gaze_ratios, Direction, FrameSignal};
pub use state::{AttentionState, DwellTimer};
pub use tracker::{AttentionReport, AttentionTracker};

use thiserror::Error;

/// Attention tracker error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GazeError {
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    #[error("Classifier expects {expected} signals, got {got}")]
    SignalMismatch {
        expected: &'static str,
        got: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}
