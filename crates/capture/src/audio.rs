//! Audio chunk types and PCM stream reader

use std::path::Path;

use alerting::unix_now;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::info;

use crate::{AudioSource, CaptureError, MicrophoneConfig};

/// A fixed-duration mono audio buffer
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Samples normalised to [-1.0, 1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Capture time (epoch seconds)
    pub captured_at: f64,
}

impl AudioChunk {
    /// Build a chunk from signed 16-bit samples
    pub fn from_i16(pcm: &[i16], sample_rate: u32, captured_at: f64) -> Self {
        Self {
            samples: pcm.iter().map(|&s| s as f32 / 32768.0).collect(),
            sample_rate,
            captured_at,
        }
    }

    /// Chunk duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Reads mono s16le PCM from an async reader in fixed-size chunks
pub struct PcmChunkSource<R> {
    reader: R,
    sample_rate: u32,
    buffer: Vec<u8>,
}

impl<R> PcmChunkSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Chunks hold at least one sample, so every read consumes input and EOF is seen
    pub fn new(reader: R, sample_rate: u32, chunk_samples: usize) -> Self {
        Self {
            reader,
            sample_rate,
            buffer: vec![0u8; chunk_samples.max(1) * 2],
        }
    }
}

impl PcmChunkSource<tokio::fs::File> {
    /// Open a PCM stream (file or FIFO) described by the microphone config
    pub async fn open(config: &MicrophoneConfig) -> Result<Self, CaptureError> {
        let path = Path::new(&config.device);
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| CaptureError::Open(format!("{}: {}", config.device, e)))?;

        info!(
            "Microphone stream {} opened ({} Hz, {:.1}s chunks)",
            config.device, config.sample_rate, config.chunk_seconds
        );
        Ok(Self::new(file, config.sample_rate, config.chunk_samples()))
    }
}

#[async_trait]
impl<R> AudioSource for PcmChunkSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_chunk(&mut self) -> Result<AudioChunk, CaptureError> {
        match self.reader.read_exact(&mut self.buffer).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(CaptureError::Closed)
            }
            Err(e) => return Err(CaptureError::Read(e.to_string())),
        }

        let pcm: Vec<i16> = self
            .buffer
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();

        Ok(AudioChunk::from_i16(&pcm, self.sample_rate, unix_now()))
    }
}
