//! Frame/angle oracle boundary
//!
//! Face detection and landmark/head-pose regression run outside this
//! process. A tracking sidecar sends one `FacePacket` per frame; the
//! `PacketOracle` turns it into a `FrameSignal` for the configured mode.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SignalMode;
use crate::signal::{gaze_ratios, FrameSignal, REQUIRED_LANDMARKS};

/// Oracle failures; the sampling loop skips the frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("Expected at least {needed} landmarks, got {got}")]
    MissingLandmarks { needed: usize, got: usize },

    #[error("Packet carries no head pose")]
    MissingHeadPose,

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Turns one captured frame into a measurement
pub trait FaceOracle: Send {
    type Frame;

    /// `Ok(None)` when no face is present
    fn observe(&mut self, frame: &Self::Frame) -> Result<Option<FrameSignal>, OracleError>;
}

/// Head pose (Euler angles)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    /// Yaw (left-right rotation) in degrees
    pub yaw: f64,
    /// Pitch (up-down tilt) in degrees
    pub pitch: f64,
    /// Roll (side tilt) in degrees
    pub roll: f64,
}

/// One frame's worth of tracking output from the sidecar
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacePacket {
    /// Whether a face was detected this frame
    pub face_detected: bool,
    /// Normalised FaceMesh landmarks [x, y, z] (ratio mode)
    #[serde(default)]
    pub landmarks: Vec<[f64; 3]>,
    /// Head angles (head-pose mode)
    #[serde(default)]
    pub head_pose: Option<HeadPose>,
}

/// Oracle over sidecar packets
#[derive(Debug, Clone, Copy)]
pub struct PacketOracle {
    mode: SignalMode,
}

impl PacketOracle {
    pub fn new(mode: SignalMode) -> Self {
        Self { mode }
    }
}

impl FaceOracle for PacketOracle {
    type Frame = FacePacket;

    fn observe(&mut self, packet: &FacePacket) -> Result<Option<FrameSignal>, OracleError> {
        if !packet.face_detected {
            return Ok(None);
        }

        match self.mode {
            SignalMode::Ratio => gaze_ratios(&packet.landmarks)
                .map(Some)
                .ok_or(OracleError::MissingLandmarks {
                    needed: REQUIRED_LANDMARKS,
                    got: packet.landmarks.len(),
                }),
            SignalMode::HeadPose => {
                let pose = packet.head_pose.ok_or(OracleError::MissingHeadPose)?;
                Ok(Some(FrameSignal::Angles {
                    yaw: pose.yaw,
                    pitch: pose.pitch,
                    roll: pose.roll,
                }))
            }
        }
    }
}
