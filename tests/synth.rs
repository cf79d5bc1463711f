//! Synthesis pipeline integration tests
//!
//! Exercises the cache + fallback chain with mock backends, without audio
//! hardware or network access.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use talkback::{
    Player, ResponseCache, SynthesisBackend, SynthesisCapabilities, SynthesisError,
    SynthesisRequest, VoiceSynthesizer,
};

/// Player that records every path it was asked to play
struct RecordingPlayer {
    plays: Arc<AtomicUsize>,
    last_path: Arc<std::sync::Mutex<Option<PathBuf>>>,
}

impl RecordingPlayer {
    fn new() -> (Self, Arc<AtomicUsize>, Arc<std::sync::Mutex<Option<PathBuf>>>) {
        let plays = Arc::new(AtomicUsize::new(0));
        let last_path = Arc::new(std::sync::Mutex::new(None));
        (
            Self {
                plays: Arc::clone(&plays),
                last_path: Arc::clone(&last_path),
            },
            plays,
            last_path,
        )
    }
}

impl Player for RecordingPlayer {
    fn play(&mut self, path: &Path) {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.last_path.lock() {
            *guard = Some(path.to_path_buf());
        }
    }
}

/// Backend that counts calls and returns fixed audio
struct CountingBackend {
    calls: Arc<AtomicUsize>,
    audio: Vec<u8>,
}

impl CountingBackend {
    fn new(audio: Vec<u8>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
                audio,
            },
            calls,
        )
    }
}

#[async_trait::async_trait]
impl SynthesisBackend for CountingBackend {
    async fn synthesize(&self, _: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.audio.clone())
    }
}

/// Backend that counts calls and always fails
struct BrokenBackend {
    calls: Arc<AtomicUsize>,
}

impl BrokenBackend {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

#[async_trait::async_trait]
impl SynthesisBackend for BrokenBackend {
    async fn synthesize(&self, _: &SynthesisRequest) -> Result<Vec<u8>, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SynthesisError::Service("backend down".to_string()))
    }
}

fn cache_in(dir: &tempfile::TempDir) -> ResponseCache {
    ResponseCache::new(dir.path().join("tts"))
}

#[tokio::test]
async fn fallback_runs_when_no_model_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let (player, plays, _) = RecordingPlayer::new();
    let (fallback, fallback_calls) = CountingBackend::new(b"fallback audio".to_vec());

    let mut synth = VoiceSynthesizer::with_backends(
        cache_in(&dir),
        Box::new(player),
        None,
        Box::new(fallback),
        "vi".to_string(),
        "en".to_string(),
    );

    synth.speak("hello").await;

    assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    assert_eq!(plays.load(Ordering::SeqCst), 1);

    // The artifact landed in the cache under the normalized-text key
    let cache = cache_in(&dir);
    let entry = cache
        .lookup(&ResponseCache::key_for("hello"))
        .expect("cached after fallback synthesis");
    assert_eq!(std::fs::read(entry).unwrap(), b"fallback audio");
}

#[tokio::test]
async fn fallback_runs_when_primary_always_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (player, plays, _) = RecordingPlayer::new();
    let (primary, primary_calls) = BrokenBackend::new();
    let (fallback, fallback_calls) = CountingBackend::new(b"plan b".to_vec());

    let capabilities = SynthesisCapabilities {
        languages: vec!["vi".to_string()],
        voice_cloning: false,
    };

    let mut synth = VoiceSynthesizer::with_backends(
        cache_in(&dir),
        Box::new(player),
        Some((Box::new(primary), capabilities)),
        Box::new(fallback),
        "vi".to_string(),
        "en".to_string(),
    );

    synth.speak("hello").await;

    assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    assert_eq!(plays.load(Ordering::SeqCst), 1);

    let cache = cache_in(&dir);
    assert!(cache.lookup(&ResponseCache::key_for("hello")).is_some());
}

#[tokio::test]
async fn cache_hit_bypasses_both_backends() {
    let dir = tempfile::tempdir().unwrap();
    let (player, plays, last_path) = RecordingPlayer::new();
    let (primary, primary_calls) = CountingBackend::new(b"primary audio".to_vec());
    let (fallback, fallback_calls) = CountingBackend::new(b"fallback audio".to_vec());

    // Seed the cache with an artifact for the phrase
    let cache = cache_in(&dir);
    let seeded = dir.path().join("seed.mp3");
    std::fs::write(&seeded, b"seeded audio").unwrap();
    let key = ResponseCache::key_for("Xin chào");
    cache.store(&key, &seeded);

    let capabilities = SynthesisCapabilities {
        languages: vec!["vi".to_string()],
        voice_cloning: false,
    };

    let mut synth = VoiceSynthesizer::with_backends(
        cache_in(&dir),
        Box::new(player),
        Some((Box::new(primary), capabilities)),
        Box::new(fallback),
        "vi".to_string(),
        "en".to_string(),
    );

    synth.speak("Xin chào").await;

    assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    assert_eq!(plays.load(Ordering::SeqCst), 1);

    // The played file is the cached entry
    let played = last_path.lock().unwrap().clone().unwrap();
    assert_eq!(std::fs::read(played).unwrap(), b"seeded audio");
}

#[tokio::test]
async fn degraded_mode_synthesizes_once_and_plays_twice() {
    let dir = tempfile::tempdir().unwrap();
    let (player, plays, _) = RecordingPlayer::new();
    let (fallback, fallback_calls) = CountingBackend::new(b"hello audio".to_vec());

    let mut synth = VoiceSynthesizer::with_backends(
        cache_in(&dir),
        Box::new(player),
        None,
        Box::new(fallback),
        "vi".to_string(),
        "en".to_string(),
    );

    synth.speak("hello").await;
    synth.speak("hello").await;

    // One secondary-service invocation, two playbacks: the second call hit
    // the cache populated by the first
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    assert_eq!(plays.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn all_backends_failing_plays_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (player, plays, _) = RecordingPlayer::new();
    let (primary, _) = BrokenBackend::new();
    let (fallback, _) = BrokenBackend::new();

    let capabilities = SynthesisCapabilities::default();

    let mut synth = VoiceSynthesizer::with_backends(
        cache_in(&dir),
        Box::new(player),
        Some((Box::new(primary), capabilities)),
        Box::new(fallback),
        "vi".to_string(),
        "en".to_string(),
    );

    // Completes without panicking, nothing played, nothing cached
    synth.speak("hello").await;

    assert_eq!(plays.load(Ordering::SeqCst), 0);
    let cache = cache_in(&dir);
    assert!(cache.lookup(&ResponseCache::key_for("hello")).is_none());
}

#[tokio::test]
async fn case_variant_of_cached_reply_is_a_hit() {
    let dir = tempfile::tempdir().unwrap();
    let (player, plays, _) = RecordingPlayer::new();
    let (fallback, fallback_calls) = CountingBackend::new(b"audio".to_vec());

    let mut synth = VoiceSynthesizer::with_backends(
        cache_in(&dir),
        Box::new(player),
        None,
        Box::new(fallback),
        "vi".to_string(),
        "en".to_string(),
    );

    synth.speak("Hẹn gặp lại").await;
    synth.speak("  HẸN GẶP LẠI  ").await;

    assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    assert_eq!(plays.load(Ordering::SeqCst), 2);
}
