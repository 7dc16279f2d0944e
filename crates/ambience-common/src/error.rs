//! Error types for Project Ambience.

use thiserror::Error;

use crate::ids::SoundId;

/// Top-level error type for Ambience operations.
#[derive(Debug, Error)]
pub enum AmbienceError {
    /// Playback device errors
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Playback device errors.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Failed to initialize audio device.
    #[error("Failed to initialize audio device: {0}")]
    DeviceInitFailed(String),

    /// No audio device available.
    #[error("No audio device available")]
    NoDevice,

    /// Failed to create a playback instance.
    #[error("Failed to create playback instance: {0}")]
    InstanceCreationFailed(String),

    /// The sound resource was never registered with the backend.
    #[error("Sound resource not found: {0:?}")]
    SoundNotFound(SoundId),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be parsed
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// File could not be serialized
    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

/// Result type for playback operations.
pub type AudioResult<T> = Result<T, AudioError>;

/// Result type alias for Ambience operations.
pub type AmbienceResult<T> = Result<T, AmbienceError>;
