//! Audio capture from microphone
//!
//! Wraps a cpal input stream and segments the incoming signal into single
//! utterances, bounded by a calibrated energy threshold, a start-of-speech
//! timeout, and a phrase time limit.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::config::ListenConfig;
use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// Poll interval while listening
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Baseline energy threshold when the room is very quiet
const BASE_ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum speech length for a valid utterance (0.3s at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800;

/// Trailing silence that ends an utterance (0.5s at 16kHz)
const SILENCE_SAMPLES: usize = 8000;

/// Result of one bounded listen window
#[derive(Debug)]
pub enum ListenOutcome {
    /// A complete utterance was captured
    Utterance(Vec<f32>),

    /// No speech started within the timeout window
    TimedOut,
}

/// Captures audio from the default input device
pub struct AudioCapture {
    #[allow(dead_code)]
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
    /// Energy threshold from the last ambient-noise calibration
    threshold: f32,
}

impl AudioCapture {
    /// Create a new audio capture instance
    ///
    /// # Errors
    ///
    /// Returns error if no input device is available or it offers no usable
    /// mono configuration — surfaced as a startup configuration problem.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device,
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            threshold: BASE_ENERGY_THRESHOLD,
        })
    }

    /// Start the capture stream
    ///
    /// # Errors
    ///
    /// Returns error if the stream cannot be built or started
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let config = self.config.clone();
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        self.stream = Some(stream);

        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop the capture stream
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            tracing::debug!("audio capture stopped");
        }
    }

    /// Get captured samples since the last call and clear the buffer
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Clear the capture buffer
    pub fn clear_buffer(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }

    /// Measure ambient noise and set the speech energy threshold
    ///
    /// Listens for `window` and raises the threshold above the measured
    /// noise floor, so a noisy room doesn't register as constant speech.
    ///
    /// # Errors
    ///
    /// Returns error if the capture stream cannot be started
    pub async fn calibrate(&mut self, window: Duration) -> Result<f32> {
        self.start()?;
        self.clear_buffer();

        tokio::time::sleep(window).await;

        let samples = self.take_buffer();
        let floor = rms(&samples);
        self.threshold = (floor * 4.0).max(BASE_ENERGY_THRESHOLD);

        tracing::debug!(
            noise_floor = floor,
            threshold = self.threshold,
            "ambient noise calibrated"
        );
        Ok(self.threshold)
    }

    /// Capture one utterance, bounded by the listen configuration
    ///
    /// Waits up to `listen.timeout` for speech to start; once speech is
    /// heard, captures until trailing silence or `listen.phrase_limit`.
    ///
    /// # Errors
    ///
    /// Returns error if the capture stream cannot be started
    pub async fn listen_utterance(&mut self, listen: ListenConfig) -> Result<ListenOutcome> {
        self.start()?;
        self.clear_buffer();

        let mut detector = UtteranceDetector::new(self.threshold);
        let window_start = Instant::now();
        let mut speech_start: Option<Instant> = None;

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let chunk = self.take_buffer();

            if detector.push(&chunk) {
                return Ok(ListenOutcome::Utterance(detector.into_samples()));
            }

            if detector.speech_started() {
                let started = *speech_start.get_or_insert_with(Instant::now);
                if started.elapsed() >= listen.phrase_limit {
                    tracing::debug!("phrase time limit reached");
                    return Ok(ListenOutcome::Utterance(detector.into_samples()));
                }
            } else if window_start.elapsed() >= listen.timeout {
                return Ok(ListenOutcome::TimedOut);
            }
        }
    }

    /// Record one utterance and persist it as a WAV file
    ///
    /// Used for capturing a voice-cloning reference sample.
    ///
    /// # Errors
    ///
    /// Returns error on capture failure, on timeout without speech, or if
    /// the WAV file cannot be written
    pub async fn record_to_wav(
        &mut self,
        path: &std::path::Path,
        listen: ListenConfig,
    ) -> Result<()> {
        match self.listen_utterance(listen).await? {
            ListenOutcome::Utterance(samples) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let wav = samples_to_wav(&samples, SAMPLE_RATE)?;
                std::fs::write(path, wav)?;
                tracing::info!(path = %path.display(), "voice sample saved");
                Ok(())
            }
            ListenOutcome::TimedOut => {
                Err(Error::Audio("no speech captured for voice sample".to_string()))
            }
        }
    }
}

/// Segments a sample stream into one utterance
struct UtteranceDetector {
    threshold: f32,
    samples: Vec<f32>,
    silence_run: usize,
    started: bool,
}

impl UtteranceDetector {
    const fn new(threshold: f32) -> Self {
        Self {
            threshold,
            samples: Vec::new(),
            silence_run: 0,
            started: false,
        }
    }

    /// Feed a chunk of samples; returns true once the utterance is complete
    fn push(&mut self, chunk: &[f32]) -> bool {
        if chunk.is_empty() {
            return false;
        }

        let is_speech = rms(chunk) > self.threshold;

        if !self.started {
            if is_speech {
                self.started = true;
                self.samples.extend_from_slice(chunk);
            }
            return false;
        }

        self.samples.extend_from_slice(chunk);

        if is_speech {
            self.silence_run = 0;
        } else {
            self.silence_run += chunk.len();
        }

        self.silence_run > SILENCE_SAMPLES && self.samples.len() > MIN_SPEECH_SAMPLES
    }

    const fn speech_started(&self) -> bool {
        self.started
    }

    fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// RMS energy of a sample slice
#[allow(clippy::cast_precision_loss)]
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Convert f32 samples to WAV bytes for the transcription API
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}
