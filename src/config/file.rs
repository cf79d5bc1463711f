//! TOML configuration file loading
//!
//! Supports `~/.config/talkback/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct TalkbackConfigFile {
    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Listen window tuning
    #[serde(default)]
    pub listen: ListenFileConfig,

    /// Responder (LLM) configuration
    #[serde(default)]
    pub responder: ResponderFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Voice synthesis and transcription configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Preferred regional language for synthesis (e.g. "vi")
    pub language: Option<String>,

    /// Fallback language when the loaded model lacks the regional one
    pub default_language: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS voice identifier for default-voice synthesis
    pub tts_voice: Option<String>,

    /// Path to a reference voice sample for cloning
    pub sample_path: Option<PathBuf>,

    /// Exit phrases that end the conversation
    pub exit_phrases: Option<Vec<String>>,
}

/// Listen window tuning
#[derive(Debug, Default, Deserialize)]
pub struct ListenFileConfig {
    /// Ambient-noise calibration duration in milliseconds
    pub calibration_ms: Option<u64>,

    /// Seconds to wait for speech to start before giving up
    pub timeout_secs: Option<u64>,

    /// Maximum utterance duration in seconds
    pub phrase_limit_secs: Option<u64>,
}

/// Responder (LLM) configuration
#[derive(Debug, Default, Deserialize)]
pub struct ResponderFileConfig {
    /// Model identifier (e.g. "gemini-2.5-pro-exp-03-25")
    pub model: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub gemini: Option<String>,
    pub elevenlabs: Option<String>,
    pub openai: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `TalkbackConfigFile::default()` if the file doesn't exist or can't
/// be parsed.
pub fn load_config_file() -> TalkbackConfigFile {
    let Some(path) = config_file_path() else {
        return TalkbackConfigFile::default();
    };

    if !path.exists() {
        return TalkbackConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                TalkbackConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            TalkbackConfigFile::default()
        }
    }
}

/// Standard config file path (`~/.config/talkback/config.toml`)
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "omni", "talkback")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
