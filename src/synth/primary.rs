//! Primary synthesis engine (`ElevenLabs`)
//!
//! Loads one model from the provider catalog at startup and synthesizes with
//! either the configured default voice or a voice cloned from a reference
//! sample. Cloned voices are registered with the provider once per sample and
//! the returned voice id is memoized.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::backend::{SynthesisBackend, SynthesisError, SynthesisRequest};
use super::SynthesisCapabilities;

const API_BASE: &str = "https://api.elevenlabs.io/v1";

/// Catalog entry returned by the provider's model listing
#[derive(serde::Deserialize)]
struct CatalogModel {
    model_id: String,
    #[serde(default)]
    can_do_voice_conversion: bool,
    #[serde(default)]
    languages: Vec<CatalogLanguage>,
}

#[derive(serde::Deserialize)]
struct CatalogLanguage {
    language_id: String,
}

/// Response from voice registration
#[derive(serde::Deserialize)]
struct VoiceAddResponse {
    voice_id: String,
}

/// Cloning-capable TTS engine backed by the `ElevenLabs` API
pub struct PrimaryEngine {
    client: reqwest::Client,
    api_key: String,
    model_id: String,
    default_voice: String,
    /// Provider-side voice id memoized per reference sample path
    cloned_voice: Mutex<Option<(PathBuf, String)>>,
}

impl PrimaryEngine {
    /// Probe the provider catalog and load the first available candidate
    ///
    /// Candidates are tried in the given order; the first one present in the
    /// catalog wins and its declared capabilities are returned with the
    /// engine. Returns `None` (not an error) when the catalog is unreachable
    /// or no candidate is listed — the caller degrades to the fallback
    /// service.
    pub async fn load(
        api_key: String,
        default_voice: String,
        candidates: &[&str],
    ) -> Option<(Self, SynthesisCapabilities)> {
        let client = reqwest::Client::new();

        let catalog = match fetch_catalog(&client, &api_key).await {
            Ok(models) => models,
            Err(e) => {
                tracing::warn!(error = %e, "model catalog unavailable");
                return None;
            }
        };

        for &candidate in candidates {
            let Some(model) = catalog.iter().find(|m| m.model_id == candidate) else {
                tracing::debug!(model = candidate, "candidate model not in catalog");
                continue;
            };

            let capabilities = SynthesisCapabilities {
                languages: model
                    .languages
                    .iter()
                    .map(|l| l.language_id.clone())
                    .collect(),
                voice_cloning: model.can_do_voice_conversion,
            };

            tracing::info!(
                model = candidate,
                cloning = capabilities.voice_cloning,
                languages = capabilities.languages.len(),
                "loaded synthesis model"
            );

            return Some((
                Self {
                    client,
                    api_key,
                    model_id: candidate.to_string(),
                    default_voice,
                    cloned_voice: Mutex::new(None),
                },
                capabilities,
            ));
        }

        tracing::warn!("no candidate synthesis model available");
        None
    }

    /// The loaded model identifier
    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Register the reference sample as a provider voice, memoizing the id
    ///
    /// A profile replaced with a different sample path re-registers; the same
    /// path reuses the memoized voice.
    async fn cloned_voice_id(&self, sample: &Path) -> Result<String, SynthesisError> {
        if let Ok(guard) = self.cloned_voice.lock() {
            if let Some((path, id)) = guard.as_ref() {
                if path == sample {
                    return Ok(id.clone());
                }
            }
        }

        let bytes = std::fs::read(sample)
            .map_err(|e| SynthesisError::Service(format!("cannot read voice sample: {e}")))?;

        let file_name = sample
            .file_name()
            .map_or_else(|| "sample.wav".to_string(), |n| n.to_string_lossy().into_owned());

        let form = reqwest::multipart::Form::new()
            .text("name", "talkback-cloned-voice")
            .part(
                "files",
                reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("audio/wav")
                    .map_err(|e| SynthesisError::Service(e.to_string()))?,
            );

        let response = self
            .client
            .post(format!("{API_BASE}/voices/add"))
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Service(format!(
                "voice registration failed {status}: {body}"
            )));
        }

        let added: VoiceAddResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Service(e.to_string()))?;

        tracing::info!(voice_id = %added.voice_id, "registered cloned voice");

        if let Ok(mut guard) = self.cloned_voice.lock() {
            *guard = Some((sample.to_path_buf(), added.voice_id.clone()));
        }

        Ok(added.voice_id)
    }
}

#[async_trait]
impl SynthesisBackend for PrimaryEngine {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        let voice_id = match &request.speaker_sample {
            Some(sample) => match self.cloned_voice_id(sample).await {
                Ok(id) => id,
                Err(e) => {
                    // Cloning is a preference, not a requirement
                    tracing::warn!(error = %e, "voice cloning unavailable, using default voice");
                    self.default_voice.clone()
                }
            },
            None => self.default_voice.clone(),
        };

        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            language_code: Option<&'a str>,
        }

        let body = TtsRequest {
            text: &request.text,
            model_id: &self.model_id,
            language_code: request.language.as_deref(),
        };

        let response = self
            .client
            .post(format!("{API_BASE}/text-to-speech/{voice_id}"))
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            // A 400 naming the language parameter means this model wants the
            // request without one; the synthesizer retries accordingly.
            if status == reqwest::StatusCode::BAD_REQUEST
                && request.language.is_some()
                && text.contains("language_code")
            {
                return Err(SynthesisError::LanguageRejected);
            }

            return Err(SynthesisError::Service(format!(
                "TTS error {status}: {text}"
            )));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

/// Fetch the provider model catalog
async fn fetch_catalog(
    client: &reqwest::Client,
    api_key: &str,
) -> Result<Vec<CatalogModel>, SynthesisError> {
    let response = client
        .get(format!("{API_BASE}/models"))
        .header("xi-api-key", api_key)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(SynthesisError::Service(format!(
            "catalog fetch failed {status}: {body}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| SynthesisError::Service(e.to_string()))
}
