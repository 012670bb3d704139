use std::error::Error;
use std::io;
use symphonia::core::errors::Error as SymphoniaError;

/// Error types specific to loading and playing audio handles.
#[derive(Debug)]
pub enum AudioError {
    LoadError(String),
    NetworkError(reqwest::Error),
    IoError(io::Error),
    SymphoniaError(SymphoniaError),
    MissingCodecParams(&'static str),
    UnknownDuration(String),
    InvalidState(String),
    PlaybackError(String),
    TaskJoinError(String),
    DecodingError(String),
    ResamplingError(String),
    AlsaError(String),
    InitializationError(String),
}

impl std::fmt::Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioError::LoadError(s) => write!(f, "Load error: {}", s),
            AudioError::NetworkError(e) => write!(f, "Network error: {}", e),
            AudioError::IoError(e) => write!(f, "I/O error: {}", e),
            AudioError::SymphoniaError(e) => write!(f, "Symphonia error: {}", e),
            AudioError::MissingCodecParams(s) => write!(f, "Missing codec parameters: {}", s),
            AudioError::UnknownDuration(url) => write!(f, "Could not determine duration of {}", url),
            AudioError::InvalidState(s) => write!(f, "Invalid state: {}", s),
            AudioError::PlaybackError(s) => write!(f, "Playback error: {}", s),
            AudioError::TaskJoinError(e) => write!(f, "Async task join error: {}", e),
            AudioError::DecodingError(e) => write!(f, "Decoding error: {}", e),
            AudioError::ResamplingError(e) => write!(f, "Resampling error: {}", e),
            AudioError::AlsaError(e) => write!(f, "ALSA error: {}", e),
            AudioError::InitializationError(e) => write!(f, "Initialization error: {}", e),
        }
    }
}

impl Error for AudioError {}

#[cfg(feature = "alsa-output")]
impl From<alsa::Error> for AudioError {
    fn from(e: alsa::Error) -> Self {
        AudioError::AlsaError(e.to_string())
    }
}

impl From<SymphoniaError> for AudioError {
    fn from(e: SymphoniaError) -> Self {
        AudioError::SymphoniaError(e)
    }
}

impl From<io::Error> for AudioError {
    fn from(e: io::Error) -> Self {
        AudioError::IoError(e)
    }
}

impl From<reqwest::Error> for AudioError {
    fn from(e: reqwest::Error) -> Self {
        AudioError::NetworkError(e)
    }
}

impl From<tokio::task::JoinError> for AudioError {
    fn from(e: tokio::task::JoinError) -> Self {
        AudioError::TaskJoinError(e.to_string())
    }
}
