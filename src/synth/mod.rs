//! Voice synthesis with caching and a fallback chain
//!
//! One model is selected at startup from a ranked candidate list. Each
//! `speak` call consults the response cache, then works through an ordered
//! list of strategies — primary synthesis (cloned voice when available), a
//! language-parameter retry, and finally the keyless fallback service —
//! until one produces audio or the list is exhausted.

mod backend;
mod fallback;
mod primary;

use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;

pub use backend::{SynthesisBackend, SynthesisError, SynthesisRequest};
pub use fallback::FallbackEngine;
pub use primary::PrimaryEngine;

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::hardware::HardwareProfile;
use crate::voice::Player;

/// Candidate models, ordered lightweight first, cloning-capable last
const MODEL_CANDIDATES: [&str; 3] = [
    "eleven_flash_v2",
    "eleven_turbo_v2_5",
    "eleven_multilingual_v2",
];

/// How many of the candidates count as lightweight
const LIGHTWEIGHT_CANDIDATES: usize = 2;

/// Capabilities a loaded model declared at load time
///
/// Populated once from the provider catalog; the call path never probes the
/// model again.
#[derive(Debug, Clone, Default)]
pub struct SynthesisCapabilities {
    /// Language codes the model supports
    pub languages: Vec<String>,

    /// Whether the model can speak in a cloned voice
    pub voice_cloning: bool,
}

/// Reference audio used for voice cloning
///
/// At most one profile is active; replacing it swaps the sample wholesale.
#[derive(Debug, Clone)]
pub struct VoiceProfile {
    /// Path to the reference sample (WAV)
    pub sample_path: PathBuf,
}

/// A loaded synthesis model with its declared capabilities
struct LoadedModel {
    backend: Box<dyn SynthesisBackend + Send + Sync>,
    capabilities: SynthesisCapabilities,
}

/// One attempt in the fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
enum Strategy {
    /// Primary engine with an optional language parameter
    Primary { language: Option<String>, cloned: bool },
    /// Secondary service, fixed language, default voice
    Fallback,
}

/// Synthesizes and plays spoken responses
pub struct VoiceSynthesizer {
    cache: ResponseCache,
    player: Box<dyn Player + Send>,
    primary: Option<LoadedModel>,
    fallback: Box<dyn SynthesisBackend + Send + Sync>,
    profile: Option<VoiceProfile>,
    preferred_language: String,
    default_language: String,
}

impl VoiceSynthesizer {
    /// Initialize the synthesizer, selecting a model from the candidate list
    ///
    /// Candidates are tried lightweight-first; a constrained hardware profile
    /// restricts the list to the lightweight prefix. Every candidate failing
    /// (or a missing provider key) leaves the synthesizer in fallback-only
    /// mode rather than failing startup.
    pub async fn initialize(
        config: &Config,
        hardware: HardwareProfile,
        player: Box<dyn Player + Send>,
    ) -> Self {
        let candidates: &[&str] = if hardware.is_constrained() {
            tracing::info!("constrained hardware, restricting to lightweight models");
            &MODEL_CANDIDATES[..LIGHTWEIGHT_CANDIDATES]
        } else {
            &MODEL_CANDIDATES[..]
        };

        let primary = match &config.api_keys.elevenlabs {
            Some(key) => {
                PrimaryEngine::load(key.clone(), config.voice.tts_voice.clone(), candidates)
                    .await
                    .map(|(engine, capabilities)| LoadedModel {
                        backend: Box::new(engine) as Box<dyn SynthesisBackend + Send + Sync>,
                        capabilities,
                    })
            }
            None => {
                tracing::warn!("no synthesis provider key, fallback service only");
                None
            }
        };

        let profile = config
            .voice
            .sample_path
            .clone()
            .filter(|p| {
                let exists = p.is_file();
                if !exists {
                    tracing::warn!(path = %p.display(), "voice sample not found, using default voice");
                }
                exists
            })
            .map(|sample_path| VoiceProfile { sample_path });

        Self {
            cache: ResponseCache::new(config.cache_dir.clone()),
            player,
            primary,
            fallback: Box::new(FallbackEngine::new(config.voice.language.clone())),
            profile,
            preferred_language: config.voice.language.clone(),
            default_language: config.voice.default_language.clone(),
        }
    }

    /// Build a synthesizer from explicit parts (tests and diagnostics)
    #[must_use]
    pub fn with_backends(
        cache: ResponseCache,
        player: Box<dyn Player + Send>,
        primary: Option<(Box<dyn SynthesisBackend + Send + Sync>, SynthesisCapabilities)>,
        fallback: Box<dyn SynthesisBackend + Send + Sync>,
        preferred_language: String,
        default_language: String,
    ) -> Self {
        Self {
            cache,
            player,
            primary: primary.map(|(backend, capabilities)| LoadedModel {
                backend,
                capabilities,
            }),
            fallback,
            profile: None,
            preferred_language,
            default_language,
        }
    }

    /// Whether a primary model was loaded
    #[must_use]
    pub const fn has_model(&self) -> bool {
        self.primary.is_some()
    }

    /// Replace the active voice profile
    pub fn set_profile(&mut self, sample_path: PathBuf) {
        tracing::info!(path = %sample_path.display(), "voice profile set");
        self.profile = Some(VoiceProfile { sample_path });
    }

    /// Speak a piece of text
    ///
    /// Never fails: a cache hit plays directly; otherwise strategies are
    /// tried in order, and if every one fails the turn ends silently with
    /// the failure logged.
    pub async fn speak(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        let digest = ResponseCache::key_for(text);

        if let Some(cached) = self.cache.lookup(&digest) {
            tracing::debug!(digest = %digest, "playing cached response");
            self.player.play(&cached);
            return;
        }

        let mut strategies = self.plan();

        while let Some(strategy) = strategies.pop_front() {
            let result = {
                let (backend, request) = self.prepare(&strategy, text);
                backend.synthesize(&request).await
            };

            match result {
                Ok(audio) => {
                    self.deliver(&digest, &audio);
                    return;
                }
                Err(SynthesisError::LanguageRejected) => {
                    tracing::debug!("language parameter rejected, retrying without it");
                    if let Strategy::Primary {
                        language: Some(_),
                        cloned,
                    } = strategy
                    {
                        strategies.push_front(Strategy::Primary {
                            language: None,
                            cloned,
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, ?strategy, "synthesis attempt failed");
                }
            }
        }

        tracing::error!("all synthesis strategies failed, nothing to play");
    }

    /// Ordered strategies for one `speak` call
    fn plan(&self) -> VecDeque<Strategy> {
        let mut strategies = VecDeque::new();

        if let Some(model) = &self.primary {
            strategies.push_back(Strategy::Primary {
                language: Some(self.select_language(&model.capabilities)),
                cloned: model.capabilities.voice_cloning && self.profile.is_some(),
            });
        }

        strategies.push_back(Strategy::Fallback);
        strategies
    }

    /// Pick the synthesis language for the loaded model
    ///
    /// Prefers the regional language when the model advertises it.
    fn select_language(&self, capabilities: &SynthesisCapabilities) -> String {
        if capabilities.languages.contains(&self.preferred_language) {
            self.preferred_language.clone()
        } else {
            self.default_language.clone()
        }
    }

    /// Resolve a strategy to a backend and request
    fn prepare(
        &self,
        strategy: &Strategy,
        text: &str,
    ) -> (&(dyn SynthesisBackend + Send + Sync), SynthesisRequest) {
        match strategy {
            Strategy::Primary { language, cloned } => {
                // plan() only emits Primary when a model is loaded
                let model = self.primary.as_ref().map_or(
                    self.fallback.as_ref(),
                    |m| m.backend.as_ref(),
                );

                let speaker_sample = if *cloned {
                    self.profile.as_ref().map(|p| p.sample_path.clone())
                } else {
                    None
                };

                (
                    model,
                    SynthesisRequest {
                        text: text.to_string(),
                        language: language.clone(),
                        speaker_sample,
                    },
                )
            }
            Strategy::Fallback => (
                self.fallback.as_ref(),
                SynthesisRequest {
                    text: text.to_string(),
                    language: None,
                    speaker_sample: None,
                },
            ),
        }
    }

    /// Write audio to a transient file, cache it, play it
    ///
    /// The transient file is removed after playback; removal failure is
    /// ignored (the handle cleans up on drop).
    fn deliver(&mut self, digest: &str, audio: &[u8]) {
        let temp = tempfile::Builder::new()
            .prefix("talkback-")
            .suffix(".mp3")
            .tempfile();

        let mut temp = match temp {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(error = %e, "cannot create output file");
                return;
            }
        };

        if let Err(e) = temp.write_all(audio) {
            tracing::error!(error = %e, "cannot write output file");
            return;
        }

        self.cache.store(digest, temp.path());
        self.player.play(temp.path());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullPlayer;

    impl Player for NullPlayer {
        fn play(&mut self, _path: &Path) {}
    }

    struct FailingBackend;

    #[async_trait::async_trait]
    impl SynthesisBackend for FailingBackend {
        async fn synthesize(&self, _: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
            Err(SynthesisError::Service("down".to_string()))
        }
    }

    struct LanguageFussyBackend {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl SynthesisBackend for LanguageFussyBackend {
        async fn synthesize(&self, req: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if req.language.is_some() {
                Err(SynthesisError::LanguageRejected)
            } else {
                Ok(vec![1, 2, 3])
            }
        }
    }

    fn synthesizer_with(
        primary: Option<(Box<dyn SynthesisBackend + Send + Sync>, SynthesisCapabilities)>,
        fallback: Box<dyn SynthesisBackend + Send + Sync>,
    ) -> (tempfile::TempDir, VoiceSynthesizer) {
        let dir = tempfile::tempdir().unwrap();
        let synth = VoiceSynthesizer::with_backends(
            ResponseCache::new(dir.path().join("tts")),
            Box::new(NullPlayer),
            primary,
            fallback,
            "vi".to_string(),
            "en".to_string(),
        );
        (dir, synth)
    }

    #[test]
    fn plan_without_model_is_fallback_only() {
        let (_dir, synth) = synthesizer_with(None, Box::new(FailingBackend));
        let plan = synth.plan();
        assert_eq!(plan, VecDeque::from([Strategy::Fallback]));
    }

    #[test]
    fn plan_prefers_regional_language_when_advertised() {
        let capabilities = SynthesisCapabilities {
            languages: vec!["en".to_string(), "vi".to_string()],
            voice_cloning: false,
        };
        let (_dir, synth) =
            synthesizer_with(Some((Box::new(FailingBackend), capabilities)), Box::new(FailingBackend));

        let plan = synth.plan();
        assert_eq!(
            plan[0],
            Strategy::Primary {
                language: Some("vi".to_string()),
                cloned: false,
            }
        );
        assert_eq!(plan[1], Strategy::Fallback);
    }

    #[test]
    fn plan_falls_back_to_default_language() {
        let capabilities = SynthesisCapabilities {
            languages: vec!["en".to_string()],
            voice_cloning: false,
        };
        let (_dir, synth) =
            synthesizer_with(Some((Box::new(FailingBackend), capabilities)), Box::new(FailingBackend));

        assert_eq!(
            synth.plan()[0],
            Strategy::Primary {
                language: Some("en".to_string()),
                cloned: false,
            }
        );
    }

    #[test]
    fn plan_requests_cloning_only_with_profile_and_capability() {
        let capabilities = SynthesisCapabilities {
            languages: vec!["en".to_string()],
            voice_cloning: true,
        };
        let (_dir, mut synth) =
            synthesizer_with(Some((Box::new(FailingBackend), capabilities)), Box::new(FailingBackend));

        // Capability without profile: no cloning
        assert_eq!(
            synth.plan()[0],
            Strategy::Primary {
                language: Some("en".to_string()),
                cloned: false,
            }
        );

        synth.set_profile(PathBuf::from("/tmp/sample.wav"));
        assert_eq!(
            synth.plan()[0],
            Strategy::Primary {
                language: Some("en".to_string()),
                cloned: true,
            }
        );
    }

    #[tokio::test]
    async fn language_rejection_retries_without_language() {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = LanguageFussyBackend {
            calls: Arc::clone(&calls),
        };
        let capabilities = SynthesisCapabilities {
            languages: vec!["vi".to_string()],
            voice_cloning: false,
        };

        let (_dir, mut synth) =
            synthesizer_with(Some((Box::new(backend), capabilities)), Box::new(FailingBackend));

        synth.speak("xin chào").await;

        // First call with the language, second without
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_text_is_a_noop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = LanguageFussyBackend {
            calls: Arc::clone(&calls),
        };

        let (_dir, mut synth) = synthesizer_with(None, Box::new(backend));
        synth.speak("   ").await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
