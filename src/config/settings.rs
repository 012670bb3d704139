//! Application settings and configuration management

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Highest playback speed accepted by validation.
pub const MAX_AUDIO_SPEED: f32 = 4.0;

/// Settings consulted by the queue builder and the playback sequencer.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSettings {
    /// Playback speed multiplier
    #[serde(default = "default_audio_speed")]
    pub audio_speed: f32,
    /// Whether answers are read aloud after their question
    #[serde(default = "default_true")]
    pub read_answers: bool,
    /// Whether examples whose related items are all learned are skipped
    #[serde(default = "default_true")]
    pub hide_learned_examples: bool,
}

fn default_audio_speed() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        PlaybackSettings {
            audio_speed: default_audio_speed(),
            read_answers: true,
            hide_learned_examples: true,
        }
    }
}

impl PlaybackSettings {
    /// Speed to apply, falling back to `1.0` for unusable values.
    pub fn effective_audio_speed(&self) -> f32 {
        if self.audio_speed.is_finite() && self.audio_speed > 0.0 {
            self.audio_speed
        } else {
            default_audio_speed()
        }
    }
}

/// Application settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Playback behaviour
    #[serde(default)]
    pub playback: PlaybackSettings,
    /// Code of the language being learned
    #[serde(default = "default_learning")]
    pub learning: String,
    /// Code of the language lessons are taught in
    #[serde(default = "default_teaching")]
    pub teaching: String,
    /// Prefix for locally served lesson folders
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// File holding learned-item progress
    #[serde(default)]
    pub progress_path: Option<String>,
    /// ALSA device audio is played on
    #[serde(default = "default_alsa_device")]
    pub alsa_device: String,
}

fn default_learning() -> String {
    "de".to_string()
}

fn default_teaching() -> String {
    "en".to_string()
}

fn default_base_url() -> String {
    "/".to_string()
}

fn default_alsa_device() -> String {
    "default".to_string()
}

/// Error types for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    ParseError(String),
    ValidationError(String),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigError::ParseError(s) => write!(f, "Parse error: {}", s),
            ConfigError::ValidationError(s) => write!(f, "Validation error: {}", s),
        }
    }
}

impl Error for ConfigError {}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            playback: PlaybackSettings::default(),
            learning: default_learning(),
            teaching: default_teaching(),
            base_url: default_base_url(),
            progress_path: None,
            alsa_device: default_alsa_device(),
        }
    }
}

impl Settings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Get the default progress file path
    pub fn default_progress_path() -> PathBuf {
        Self::config_dir().join("progress.json")
    }

    fn config_dir() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("lessonaudio")
    }

    /// Progress file to use, configured or default
    pub fn resolved_progress_path(&self) -> PathBuf {
        self.progress_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_progress_path)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        let speed = self.playback.audio_speed;
        if !speed.is_finite() || speed <= 0.0 || speed > MAX_AUDIO_SPEED {
            return Err(ConfigError::ValidationError(format!(
                "Audio speed must be in (0, {}], got {}",
                MAX_AUDIO_SPEED, speed
            )));
        }

        if self.learning.trim().is_empty() {
            return Err(ConfigError::ValidationError("Learning language cannot be empty".to_string()));
        }

        if self.teaching.trim().is_empty() {
            return Err(ConfigError::ValidationError("Teaching language cannot be empty".to_string()));
        }

        if self.alsa_device.trim().is_empty() {
            return Err(ConfigError::ValidationError("ALSA device cannot be empty".to_string()));
        }

        Ok(())
    }
}
