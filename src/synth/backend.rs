//! Synthesis backend seam
//!
//! The synthesizer drives every engine through this trait so the fallback
//! chain (and its tests) never care which service sits behind a strategy.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// Errors a synthesis backend can report
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The backend rejected the language parameter for this model
    ///
    /// The caller is expected to retry the same request without a language.
    #[error("language parameter rejected")]
    LanguageRejected,

    /// The backend failed to produce audio
    #[error("synthesis failed: {0}")]
    Service(String),

    /// Transport-level failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One synthesis request
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// Text to render as speech
    pub text: String,

    /// Target language code, if the strategy wants to pass one
    pub language: Option<String>,

    /// Reference sample to clone the voice from, for cloning-capable engines
    pub speaker_sample: Option<PathBuf>,
}

/// A speech synthesis engine
///
/// Returns encoded audio bytes (MP3) on success.
#[async_trait]
pub trait SynthesisBackend {
    /// Synthesize speech for a request
    ///
    /// # Errors
    ///
    /// Returns `SynthesisError::LanguageRejected` when the language parameter
    /// is unsupported for the active model, and `Service`/`Http` for
    /// everything else.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError>;
}
