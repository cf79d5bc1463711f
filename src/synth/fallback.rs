//! Fallback synthesis service
//!
//! A keyless translate-endpoint TTS used when the primary engine is absent or
//! fails. Always speaks the fixed regional language in the default voice, so
//! the assistant stays audible even with no provider credentials at all.

use async_trait::async_trait;

use super::backend::{SynthesisBackend, SynthesisError, SynthesisRequest};

const TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Requests longer than this get truncated; the endpoint rejects long input
const MAX_CHARS: usize = 200;

/// Translate-endpoint TTS client
pub struct FallbackEngine {
    client: reqwest::Client,
    language: String,
}

impl FallbackEngine {
    /// Create a fallback engine speaking `language`
    #[must_use]
    pub fn new(language: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            language,
        }
    }
}

#[async_trait]
impl SynthesisBackend for FallbackEngine {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        // Fixed language and default voice regardless of the request
        let text: String = request.text.chars().take(MAX_CHARS).collect();

        let url = format!(
            "{TTS_URL}?ie=UTF-8&client=tw-ob&tl={}&q={}",
            self.language,
            urlencoding::encode(&text)
        );

        let response = self
            .client
            .get(&url)
            .header("Referer", "https://translate.google.com/")
            .header("User-Agent", "Mozilla/5.0")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(SynthesisError::Service(format!(
                "fallback TTS error {status}"
            )));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SynthesisError::Service("fallback TTS returned no audio".to_string()));
        }

        Ok(audio.to_vec())
    }
}
