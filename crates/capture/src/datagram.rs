//! JSON-over-UDP tracking feed
//!
//! The face-tracking sidecar sends one JSON object per datagram. Each
//! datagram is decoded into `T`; a malformed datagram is a transient
//! failure and only costs one sampling cycle.

use std::marker::PhantomData;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::net::UdpSocket;
use tracing::info;

use crate::{CaptureError, FeedConfig, FrameSource};

/// Receives JSON datagrams and decodes them as `T`
pub struct JsonDatagramSource<T> {
    socket: UdpSocket,
    buffer: Vec<u8>,
    _packet: PhantomData<fn() -> T>,
}

impl<T> JsonDatagramSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Bind the UDP socket described by the feed config
    pub async fn bind(config: &FeedConfig) -> Result<Self, CaptureError> {
        let socket = UdpSocket::bind(&config.listen_address).await.map_err(|e| {
            CaptureError::Open(format!("Failed to bind {}: {}", config.listen_address, e))
        })?;

        info!("Tracking feed listening on {}", config.listen_address);
        Ok(Self::from_socket(socket, config.max_packet_bytes))
    }

    pub fn from_socket(socket: UdpSocket, max_packet_bytes: usize) -> Self {
        Self {
            socket,
            buffer: vec![0u8; max_packet_bytes.max(1)],
            _packet: PhantomData,
        }
    }

    /// Local address of the bound socket
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, CaptureError> {
        self.socket
            .local_addr()
            .map_err(|e| CaptureError::Read(e.to_string()))
    }
}

#[async_trait]
impl<T> FrameSource for JsonDatagramSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Frame = T;

    async fn next_frame(&mut self) -> Result<T, CaptureError> {
        let len = self
            .socket
            .recv(&mut self.buffer)
            .await
            .map_err(|e| CaptureError::Read(e.to_string()))?;

        serde_json::from_slice(&self.buffer[..len]).map_err(|e| CaptureError::Decode(e.to_string()))
    }
}
