//! The conversation loop
//!
//! Listens for one utterance at a time, transcribes it, and either ends the
//! conversation on an exit phrase or speaks the responder's reply. Every
//! per-turn failure degrades to a spoken apology or a silent re-listen; only
//! the exit phrase stops the loop.

use std::time::Duration;

use crate::config::ListenConfig;
use crate::responder::Responder;
use crate::synth::VoiceSynthesizer;
use crate::voice::{AudioCapture, ListenOutcome, SAMPLE_RATE, SpeechToText, samples_to_wav};
use crate::{Error, Result};

/// Pause after an unexpected error, to avoid a tight failure spin
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Spoken once at startup
const GREETING: &str =
    "Xin chào! Tôi là trợ lý ảo tích hợp với Gemini API. Tôi đang lắng nghe bạn đây.";

/// Spoken before the loop ends
const FAREWELL: &str = "Tạm biệt bạn! Hẹn gặp lại.";

/// Spoken when nothing intelligible was recognized
const APOLOGY_UNRECOGNIZED: &str = "Xin lỗi, tôi không hiểu bạn nói gì.";

/// Spoken when the transcription service fails
const APOLOGY_STT: &str = "Lỗi kết nối dịch vụ nhận dạng giọng nói.";

/// What a single turn decided
enum TurnOutcome {
    /// Keep listening
    Continue,
    /// An exit phrase was heard; the farewell has been spoken
    Exit,
}

/// Drives the listen → transcribe → respond → speak cycle
pub struct ConversationLoop {
    capture: AudioCapture,
    stt: SpeechToText,
    responder: Responder,
    synthesizer: VoiceSynthesizer,
    listen: ListenConfig,
    exit_phrases: Vec<String>,
}

impl ConversationLoop {
    /// Assemble the loop from its collaborators
    #[must_use]
    pub fn new(
        capture: AudioCapture,
        stt: SpeechToText,
        responder: Responder,
        synthesizer: VoiceSynthesizer,
        listen: ListenConfig,
        exit_phrases: Vec<String>,
    ) -> Self {
        Self {
            capture,
            stt,
            responder,
            synthesizer,
            listen,
            exit_phrases,
        }
    }

    /// Run until an exit phrase is heard
    ///
    /// # Errors
    ///
    /// Returns error only if the capture stream cannot be started at all;
    /// everything else recovers within the loop.
    pub async fn run(&mut self) -> Result<()> {
        self.capture.calibrate(self.listen.calibration).await?;
        self.synthesizer.speak(GREETING).await;

        loop {
            match self.turn().await {
                Ok(TurnOutcome::Continue) => {}
                Ok(TurnOutcome::Exit) => break,
                Err(e) => {
                    tracing::error!(error = %e, "unexpected error, pausing before retry");
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
            }
        }

        self.capture.stop();
        tracing::info!("conversation ended");
        Ok(())
    }

    /// One listen → transcribe → respond → speak turn
    async fn turn(&mut self) -> Result<TurnOutcome> {
        // Short recalibration each turn, like the original listen loop
        self.capture.calibrate(self.listen.calibration).await?;

        tracing::info!("listening");
        let samples = match self.capture.listen_utterance(self.listen).await? {
            ListenOutcome::Utterance(samples) => samples,
            // No speech within the window: listen again quietly
            ListenOutcome::TimedOut => return Ok(TurnOutcome::Continue),
        };

        let wav = samples_to_wav(&samples, SAMPLE_RATE)?;

        let transcript = match self.stt.transcribe(wav).await {
            Ok(text) => text,
            Err(Error::NoSpeech) => {
                tracing::warn!("could not recognize speech");
                self.synthesizer.speak(APOLOGY_UNRECOGNIZED).await;
                return Ok(TurnOutcome::Continue);
            }
            Err(Error::Stt(e)) => {
                tracing::error!(error = %e, "transcription service error");
                self.synthesizer.speak(APOLOGY_STT).await;
                return Ok(TurnOutcome::Continue);
            }
            Err(e) => return Err(e),
        };

        tracing::info!(transcript = %transcript, "utterance transcribed");

        if contains_exit_phrase(&transcript, &self.exit_phrases) {
            self.synthesizer.speak(FAREWELL).await;
            return Ok(TurnOutcome::Exit);
        }

        let reply = self.responder.generate(&transcript).await;
        tracing::info!(reply = %reply, "responder replied");

        self.synthesizer.speak(&reply).await;
        Ok(TurnOutcome::Continue)
    }
}

/// Case-insensitive check for any exit phrase anywhere in the transcript
fn contains_exit_phrase(transcript: &str, phrases: &[String]) -> bool {
    let lower = transcript.to_lowercase();
    phrases
        .iter()
        .any(|phrase| lower.contains(&phrase.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrases() -> Vec<String> {
        vec!["dừng lại".to_string(), "tạm biệt".to_string()]
    }

    #[test]
    fn exit_phrase_detected_any_casing() {
        assert!(contains_exit_phrase("DỪNG LẠI ngay", &phrases()));
        assert!(contains_exit_phrase("thôi, tạm biệt nhé", &phrases()));
        assert!(contains_exit_phrase("Tạm Biệt", &phrases()));
    }

    #[test]
    fn exit_phrase_detected_mid_sentence() {
        assert!(contains_exit_phrase(
            "tôi nghĩ chúng ta nên dừng lại ở đây",
            &phrases()
        ));
    }

    #[test]
    fn ordinary_transcript_never_exits() {
        assert!(!contains_exit_phrase("hôm nay trời đẹp quá", &phrases()));
        assert!(!contains_exit_phrase("dừng", &phrases()));
        assert!(!contains_exit_phrase("", &phrases()));
    }

    #[test]
    fn uppercase_configured_phrase_still_matches() {
        let shouty = vec!["TẠM BIỆT".to_string()];
        assert!(contains_exit_phrase("tạm biệt bạn", &shouty));
    }
}
