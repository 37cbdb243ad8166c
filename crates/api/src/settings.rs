//! Layered monitor settings: defaults, optional TOML file, `PROCTOR__` environment

use std::path::{Path, PathBuf};

use capture::{FeedConfig, MicrophoneConfig};
use gaze::GazeConfig;
use serde::{Deserialize, Serialize};
use speaker::SpeakerConfig;
use storage::SessionKey;
use thiserror::Error;
use tracing::info;

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// HTTP query server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    /// Origins allowed to read events from a browser
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            cors_origins: vec!["http://localhost:5018".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// JSON lines instead of the human-readable formatter
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Attention pipeline: tracking feed plus tracker parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeSettings {
    pub enabled: bool,
    pub feed: FeedConfig,
    pub tracker: GazeConfig,
}

impl Default for GazeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            feed: FeedConfig::default(),
            tracker: GazeConfig::default(),
        }
    }
}

/// Speaker pipeline: microphone stream plus tracker parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeakerSettings {
    pub enabled: bool,
    pub microphone: MicrophoneConfig,
    pub tracker: SpeakerConfig,
}

impl Default for SpeakerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            microphone: MicrophoneConfig::default(),
            tracker: SpeakerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite URL for the event history; `None` disables persistence
    pub database_url: Option<String>,
    /// Append-only JSONL event log
    pub event_log: Option<PathBuf>,
    /// Events scoring at or below this are not persisted
    pub min_score: f64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_url: None,
            event_log: None,
            min_score: 0.5,
        }
    }
}

/// Complete monitor settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub session: SessionKey,
    pub gaze: GazeSettings,
    pub speaker: SpeakerSettings,
    pub storage: StorageSettings,
}

impl MonitorSettings {
    /// Load from an optional TOML file, then `PROCTOR__SECTION__KEY` variables
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            info!("Loading settings from: {}", path.display());
        } else {
            info!("No settings file at {}, using defaults", path.display());
        }

        let settings: Self = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("PROCTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Err(e) = self.gaze.tracker.validate() {
            return Err(SettingsError::InvalidValue {
                field: "gaze.tracker".to_string(),
                message: e.to_string(),
            });
        }

        if let Err(e) = self.speaker.tracker.validate() {
            return Err(SettingsError::InvalidValue {
                field: "speaker.tracker".to_string(),
                message: e.to_string(),
            });
        }

        if self.server.cors_origins.iter().any(|origin| origin.trim() == "*") {
            return Err(SettingsError::InvalidValue {
                field: "server.cors_origins".to_string(),
                message: "Wildcard origin cannot be combined with credentials; list origins explicitly"
                    .to_string(),
            });
        }

        let chunk_seconds = self.speaker.microphone.chunk_seconds;
        if !chunk_seconds.is_finite() || chunk_seconds <= 0.0 {
            return Err(SettingsError::InvalidValue {
                field: "speaker.microphone.chunk_seconds".to_string(),
                message: "Chunk duration must be a positive number of seconds".to_string(),
            });
        }

        if self.speaker.microphone.sample_rate == 0 {
            return Err(SettingsError::InvalidValue {
                field: "speaker.microphone.sample_rate".to_string(),
                message: "Sample rate must be greater than 0".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.storage.min_score) {
            return Err(SettingsError::InvalidValue {
                field: "storage.min_score".to_string(),
                message: "Score must be between 0.0 and 1.0".to_string(),
            });
        }

        Ok(())
    }
}
