use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use talkback::config::ListenConfig;
use talkback::setup::{self, SampleChoice};
use talkback::voice::{AudioCapture, AudioPlayback, SpeechToText};
use talkback::{Config, ConversationLoop, HardwareProfile, Responder, VoiceSynthesizer};

/// Talkback - voice chat assistant with cloned-voice TTS and response caching
#[derive(Parser)]
#[command(name = "talkback", version, about)]
struct Cli {
    /// Path to a voice sample to clone (skips the interactive prompt)
    #[arg(long, env = "TALKBACK_VOICE_SAMPLE")]
    voice_sample: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Synthesize and play a phrase through the full TTS chain
    TestTts {
        /// Text to speak
        #[arg(default_value = "Xin chào, đây là bài kiểm tra tổng hợp giọng nói.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,talkback=info",
        1 => "info,talkback=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestTts { text } => test_tts(&text).await,
        };
    }

    let mut config = Config::load()?;
    if cli.voice_sample.is_some() {
        config.voice.sample_path = cli.voice_sample;
    }

    // Missing responder credential: surfaced before anything starts
    if config.api_keys.gemini.is_none() && !setup::confirm_missing_credential()? {
        println!("Exiting: no API key configured.");
        return Ok(());
    }

    let stt_key = config.api_keys.openai.clone().ok_or_else(|| {
        anyhow::anyhow!("OPENAI_API_KEY is required for speech recognition")
    })?;
    let stt = SpeechToText::new(
        stt_key,
        config.voice.stt_model.clone(),
        config.voice.language.clone(),
    )?;

    // Microphone preflight with actionable hints
    let mut capture = match AudioCapture::new() {
        Ok(capture) => capture,
        Err(e) => {
            println!("Microphone initialization failed: {e}");
            println!("Make sure that:");
            println!("  1. A microphone is connected");
            println!("  2. Your terminal has microphone permission");
            println!("  3. The audio backend is installed (ALSA/PulseAudio on Linux)");
            return Err(e.into());
        }
    };

    println!("Checking microphone...");
    capture.calibrate(Duration::from_secs(1)).await?;
    println!("Microphone OK");

    let hardware = HardwareProfile::detect();
    let playback = AudioPlayback::new(hardware.platform);

    let mut synthesizer =
        VoiceSynthesizer::initialize(&config, hardware, Box::new(playback)).await;

    // Voice sample: interactive unless one was already configured
    if config.voice.sample_path.is_none() {
        match setup::choose_voice_sample()? {
            SampleChoice::RecordNew => {
                let path = config.default_sample_path();
                record_voice_sample(&mut capture, &path).await.map_or_else(
                    |e| {
                        tracing::warn!(error = %e, "sample recording failed, using default voice");
                    },
                    |()| synthesizer.set_profile(path),
                );
            }
            SampleChoice::UseExisting(path) => {
                println!("Loaded voice sample from: {}", path.display());
                synthesizer.set_profile(path);
            }
            SampleChoice::DefaultVoice => {}
        }
    }

    println!("\nHow to use:");
    println!("- Speak into the microphone when you see \"listening\"");
    println!(
        "- Say \"{}\" to end the conversation",
        config.voice.exit_phrases.join("\" or \"")
    );

    let responder = Responder::new(config.api_keys.gemini.clone(), &config.responder)?;

    let mut conversation = ConversationLoop::new(
        capture,
        stt,
        responder,
        synthesizer,
        config.listen,
        config.voice.exit_phrases.clone(),
    );

    conversation.run().await?;
    Ok(())
}

/// Record a cloning reference sample from the microphone
async fn record_voice_sample(
    capture: &mut AudioCapture,
    path: &std::path::Path,
) -> anyhow::Result<()> {
    println!("\nTo create a voice sample, please read this sentence aloud:");
    println!("  {}", setup::SAMPLE_PROMPT_TEXT);
    println!("\nRecording... speak clearly.");

    capture.calibrate(Duration::from_secs(1)).await?;

    let listen = ListenConfig {
        calibration: Duration::from_secs(1),
        timeout: Duration::from_secs(10),
        phrase_limit: Duration::from_secs(15),
    };
    capture.record_to_wav(path, listen).await?;

    println!("Voice sample saved to: {}", path.display());
    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check your input device and permissions.");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Synthesize and play text through the cache + fallback chain
async fn test_tts(text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let config = Config::load()?;
    let hardware = HardwareProfile::detect();
    let playback = AudioPlayback::new(hardware.platform);

    let mut synthesizer =
        VoiceSynthesizer::initialize(&config, hardware, Box::new(playback)).await;

    if synthesizer.has_model() {
        println!("Primary model loaded; synthesizing...");
    } else {
        println!("No primary model; using the fallback service...");
    }

    synthesizer.speak(text).await;

    println!("\n---");
    println!("If you heard the phrase, TTS is working!");

    Ok(())
}
