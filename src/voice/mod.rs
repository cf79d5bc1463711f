//! Voice I/O module
//!
//! Microphone capture with silence-bounded utterance detection, cloud
//! transcription, and playback through an external player process.

mod capture;
mod playback;
mod stt;

pub use capture::{AudioCapture, ListenOutcome, SAMPLE_RATE, samples_to_wav};
pub use playback::{AudioPlayback, Player};
pub use stt::SpeechToText;
