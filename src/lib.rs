//! Talkback - voice chat assistant with cloned-voice TTS and response caching
//!
//! This library provides the core functionality for the Talkback assistant:
//! - Microphone capture with silence-bounded utterance detection
//! - Speech-to-text via a cloud transcription API
//! - Replies from the Gemini `generateContent` API
//! - Voice synthesis with optional voice cloning and a two-stage fallback chain
//! - A content-addressed disk cache of synthesized responses
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 ConversationLoop                     │
//! │   listen  →  transcribe  →  respond  →  speak       │
//! └───────┬───────────┬────────────┬───────────┬────────┘
//!         │           │            │           │
//!   AudioCapture  SpeechToText  Responder  VoiceSynthesizer
//!                                              │
//!                              ResponseCache ──┼── primary engine
//!                              AudioPlayback ──┴── fallback service
//! ```

pub mod cache;
pub mod config;
pub mod conversation;
pub mod error;
pub mod hardware;
pub mod responder;
pub mod setup;
pub mod synth;
pub mod voice;

pub use cache::ResponseCache;
pub use config::Config;
pub use conversation::ConversationLoop;
pub use error::{Error, Result};
pub use hardware::{HardwareProfile, PlatformFamily};
pub use responder::Responder;
pub use synth::{
    SynthesisBackend, SynthesisCapabilities, SynthesisError, SynthesisRequest, VoiceProfile,
    VoiceSynthesizer,
};
pub use voice::{AudioCapture, AudioPlayback, ListenOutcome, Player, SpeechToText, samples_to_wav};
