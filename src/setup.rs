//! Interactive startup prompts
//!
//! Talkback is configured conversationally at launch: whether to continue
//! without a responder credential, and where the voice-cloning sample comes
//! from (recorded now, loaded from disk, or skipped for the default voice).

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use crate::config::GEMINI_KEY_ENV;

/// Text the user is asked to read when recording a voice sample
pub const SAMPLE_PROMPT_TEXT: &str =
    "Xin chào, đây là mẫu giọng nói của tôi để sử dụng cho trợ lý ảo.";

/// Where the voice-cloning sample should come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleChoice {
    /// Record a fresh sample from the microphone
    RecordNew,
    /// Use an existing sample file
    UseExisting(PathBuf),
    /// No sample; synthesize with the default voice
    DefaultVoice,
}

/// Warn about the missing responder credential and ask whether to continue
///
/// # Errors
///
/// Returns error if the interactive prompt fails (e.g. no TTY)
pub fn confirm_missing_credential() -> anyhow::Result<bool> {
    println!("Warning: {GEMINI_KEY_ENV} is not set.");
    println!("Set it with: export {GEMINI_KEY_ENV}=your_api_key_here");
    println!("Replies will be an apology message until a key is configured.\n");

    let proceed = Confirm::new()
        .with_prompt("Continue without an API key?")
        .default(false)
        .interact()?;

    Ok(proceed)
}

/// Ask where the voice-cloning sample should come from
///
/// # Errors
///
/// Returns error if an interactive prompt fails
pub fn choose_voice_sample() -> anyhow::Result<SampleChoice> {
    let record_new = Confirm::new()
        .with_prompt("Record a new voice sample?")
        .default(false)
        .interact()?;

    if record_new {
        return Ok(SampleChoice::RecordNew);
    }

    let use_existing = Confirm::new()
        .with_prompt("Load an existing voice sample?")
        .default(false)
        .interact()?;

    if !use_existing {
        return Ok(SampleChoice::DefaultVoice);
    }

    let path: String = Input::new()
        .with_prompt("Path to the sample audio file")
        .interact_text()?;
    let path = PathBuf::from(path.trim());

    if path.is_file() {
        Ok(SampleChoice::UseExisting(path))
    } else {
        println!("File not found: {}", path.display());
        println!("Continuing with the default voice.");
        Ok(SampleChoice::DefaultVoice)
    }
}
