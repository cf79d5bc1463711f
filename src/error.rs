//! Error types for Talkback

use thiserror::Error;

/// Result type alias for Talkback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Talkback
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio capture or encoding error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text service error
    #[error("STT error: {0}")]
    Stt(String),

    /// Audio captured but no speech was recognized in it
    #[error("no speech recognized")]
    NoSpeech,

    /// Text-to-speech error (both synthesis strategies exhausted)
    #[error("TTS error: {0}")]
    Tts(String),

    /// Remote responder error
    #[error("responder error: {0}")]
    Responder(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
