//! Diarization oracle seam and HTTP client

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use capture::AudioChunk;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::DiarizerConfig;
use crate::SpeakerError;

/// Diarization failure; callers treat every variant as "no result for this chunk"
#[derive(Error, Debug)]
pub enum DiarizationError {
    #[error("Diarizer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Diarizer returned status {0}")]
    Status(u16),

    #[error("Diarizer unavailable: {0}")]
    Unavailable(String),
}

/// Pre-trained diarizer: returns the set of speaker labels active in a chunk.
#[async_trait]
pub trait DiarizationOracle: Send + Sync {
    async fn speakers(&self, chunk: &AudioChunk) -> Result<BTreeSet<String>, DiarizationError>;
}

#[derive(Serialize)]
struct DiarizeRequest<'a> {
    sample_rate: u32,
    samples: &'a [f32],
}

#[derive(Deserialize)]
struct DiarizeResponse {
    #[serde(default)]
    speakers: Vec<String>,
}

/// Posts chunks to a diarization service over HTTP
pub struct HttpDiarizer {
    client: reqwest::Client,
    url: String,
}

impl HttpDiarizer {
    pub fn new(config: &DiarizerConfig) -> Result<Self, SpeakerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SpeakerError::Diarizer(e.to_string()))?;

        info!("Diarizer endpoint: {}", config.url);
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl DiarizationOracle for HttpDiarizer {
    async fn speakers(&self, chunk: &AudioChunk) -> Result<BTreeSet<String>, DiarizationError> {
        let response = self
            .client
            .post(&self.url)
            .json(&DiarizeRequest {
                sample_rate: chunk.sample_rate,
                samples: &chunk.samples,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiarizationError::Status(status.as_u16()));
        }

        let body: DiarizeResponse = response.json().await?;
        Ok(body.speakers.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/diarize", addr)
    }

    fn diarizer(url: String) -> HttpDiarizer {
        HttpDiarizer::new(&DiarizerConfig {
            url,
            timeout_ms: 2_000,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_collects_distinct_labels() {
        let app = Router::new().route(
            "/diarize",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["sample_rate"], 16_000);
                assert_eq!(body["samples"].as_array().map(Vec::len), Some(4));
                Json(json!({ "speakers": ["SPEAKER_01", "SPEAKER_00", "SPEAKER_01"] }))
            }),
        );
        let url = serve(app).await;

        let chunk = AudioChunk::from_i16(&[0, 1, 2, 3], 16_000, 0.0);
        let labels = diarizer(url).speakers(&chunk).await.unwrap();

        assert_eq!(labels.len(), 2);
        assert!(labels.contains("SPEAKER_00"));
    }

    #[tokio::test]
    async fn test_error_status() {
        let app = Router::new().route(
            "/diarize",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let url = serve(app).await;

        let chunk = AudioChunk::from_i16(&[0; 8], 16_000, 0.0);
        let result = diarizer(url).speakers(&chunk).await;

        assert!(matches!(result, Err(DiarizationError::Status(503))));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let chunk = AudioChunk::from_i16(&[0; 8], 16_000, 0.0);
        let result = diarizer("http://127.0.0.1:1/diarize".into())
            .speakers(&chunk)
            .await;

        assert!(matches!(result, Err(DiarizationError::Request(_))));
    }
}
