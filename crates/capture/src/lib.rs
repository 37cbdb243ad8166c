//! Capture Library for the Proctoring Monitor
//!
//! Provides the device side of both trackers:
//! - Per-frame face-tracking feed (JSON datagrams from a tracking sidecar)
//! - Microphone PCM stream cut into fixed-duration chunks
//! - Stop signal observed by every sampling loop

pub mod audio;
pub mod datagram;
pub mod stop;

pub use audio::{AudioChunk, PcmChunkSource};
pub use datagram::JsonDatagramSource;
pub use stop::{stop_channel, StopHandle, StopSignal};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Capture error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to open device: {0}")]
    Open(String),

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Malformed payload: {0}")]
    Decode(String),

    #[error("Device stream closed")]
    Closed,
}

impl CaptureError {
    /// A transient failure skips one sampling cycle; anything else stops the tracker.
    pub fn is_transient(&self) -> bool {
        matches!(self, CaptureError::Read(_) | CaptureError::Decode(_))
    }
}

/// A device that yields one frame (or tracking packet) per read.
#[async_trait]
pub trait FrameSource: Send {
    type Frame: Send;

    async fn next_frame(&mut self) -> Result<Self::Frame, CaptureError>;
}

/// A device that yields fixed-duration audio chunks.
#[async_trait]
pub trait AudioSource: Send {
    async fn next_chunk(&mut self) -> Result<AudioChunk, CaptureError>;
}

/// Face-tracking feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// UDP address the tracking sidecar sends packets to
    pub listen_address: String,
    /// Largest datagram accepted (bytes)
    pub max_packet_bytes: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1:5005".to_string(),
            max_packet_bytes: 65536,
        }
    }
}

/// Microphone configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrophoneConfig {
    /// Path of the raw PCM stream (FIFO or file), mono s16le
    pub device: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Chunk duration in seconds
    pub chunk_seconds: f64,
}

impl Default for MicrophoneConfig {
    fn default() -> Self {
        Self {
            device: "/tmp/proctor-mic.pcm".to_string(),
            sample_rate: 16_000,
            chunk_seconds: 3.0,
        }
    }
}

impl MicrophoneConfig {
    /// Number of samples in one chunk
    pub fn chunk_samples(&self) -> usize {
        (self.sample_rate as f64 * self.chunk_seconds).round() as usize
    }
}
