//! Configuration management for Talkback

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Environment variable carrying the responder credential
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

/// Talkback configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding cached synthesized responses
    pub cache_dir: PathBuf,

    /// Directory for persisted data (recorded voice samples)
    pub data_dir: PathBuf,

    /// Voice synthesis and transcription settings
    pub voice: VoiceConfig,

    /// Listen window tuning
    pub listen: ListenConfig,

    /// Responder settings
    pub responder: ResponderConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Voice synthesis and transcription settings
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Preferred regional language for synthesis and transcription
    pub language: String,

    /// Language used when the loaded model lacks the regional one
    pub default_language: String,

    /// STT model identifier
    pub stt_model: String,

    /// Voice identifier for default-voice synthesis
    pub tts_voice: String,

    /// Reference voice sample for cloning, if one is configured
    pub sample_path: Option<PathBuf>,

    /// Phrases that end the conversation when heard
    pub exit_phrases: Vec<String>,
}

/// Listen window tuning
#[derive(Debug, Clone, Copy)]
pub struct ListenConfig {
    /// Ambient-noise calibration window
    pub calibration: Duration,

    /// How long to wait for speech to start
    pub timeout: Duration,

    /// Maximum utterance duration
    pub phrase_limit: Duration,
}

/// Responder settings
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Gemini model identifier
    pub model: String,

    /// Request timeout
    pub timeout: Duration,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Gemini API key (remote responder)
    pub gemini: Option<String>,

    /// `ElevenLabs` API key (primary synthesis)
    pub elevenlabs: Option<String>,

    /// `OpenAI` API key (Whisper transcription)
    pub openai: Option<String>,
}

impl Config {
    /// Load configuration from the TOML overlay, environment, and defaults
    ///
    /// # Errors
    ///
    /// Returns error if the platform provides no home directory to anchor
    /// the cache and data directories.
    pub fn load() -> Result<Self> {
        let file = file::load_config_file();

        let dirs = directories::ProjectDirs::from("dev", "omni", "talkback")
            .ok_or_else(|| Error::Config("no home directory available".to_string()))?;

        let cache_dir = dirs.cache_dir().join("tts");
        let data_dir = dirs.data_dir().to_path_buf();

        let api_keys = ApiKeys {
            gemini: file
                .api_keys
                .gemini
                .or_else(|| std::env::var(GEMINI_KEY_ENV).ok())
                .filter(|k| !k.is_empty()),
            elevenlabs: file
                .api_keys
                .elevenlabs
                .or_else(|| std::env::var("ELEVENLABS_API_KEY").ok())
                .filter(|k| !k.is_empty()),
            openai: file
                .api_keys
                .openai
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|k| !k.is_empty()),
        };

        let voice = VoiceConfig {
            language: file.voice.language.unwrap_or_else(|| "vi".to_string()),
            default_language: file
                .voice
                .default_language
                .unwrap_or_else(|| "en".to_string()),
            stt_model: file
                .voice
                .stt_model
                .unwrap_or_else(|| "whisper-1".to_string()),
            tts_voice: file
                .voice
                .tts_voice
                .unwrap_or_else(|| "21m00Tcm4TlvDq8ikWAM".to_string()),
            sample_path: file.voice.sample_path,
            exit_phrases: file.voice.exit_phrases.unwrap_or_else(|| {
                vec!["dừng lại".to_string(), "tạm biệt".to_string()]
            }),
        };

        let listen = ListenConfig {
            calibration: Duration::from_millis(file.listen.calibration_ms.unwrap_or(500)),
            timeout: Duration::from_secs(file.listen.timeout_secs.unwrap_or(5)),
            phrase_limit: Duration::from_secs(file.listen.phrase_limit_secs.unwrap_or(10)),
        };

        let responder = ResponderConfig {
            model: file
                .responder
                .model
                .unwrap_or_else(|| "gemini-2.5-pro-exp-03-25".to_string()),
            timeout: Duration::from_secs(file.responder.timeout_secs.unwrap_or(30)),
        };

        Ok(Self {
            cache_dir,
            data_dir,
            voice,
            listen,
            responder,
            api_keys,
        })
    }

    /// Default path for a freshly recorded voice sample
    #[must_use]
    pub fn default_sample_path(&self) -> PathBuf {
        self.data_dir.join("voice_sample.wav")
    }
}
