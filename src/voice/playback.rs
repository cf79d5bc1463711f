//! Audio playback through an external player process
//!
//! Each platform family gets its own blocking player command. Playback
//! failures are logged and swallowed: a missing player binary must never
//! take the conversation loop down with it.

use std::path::Path;
use std::process::Command;

use crate::hardware::PlatformFamily;

/// Plays an audio file; the seam is a trait so tests can observe calls
pub trait Player {
    /// Play the file at `path`, blocking until playback ends
    ///
    /// Failures are handled internally and never propagated.
    fn play(&mut self, path: &Path);
}

/// The external player command for a platform family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerCommand {
    /// macOS built-in player
    Afplay,
    /// Common Linux MP3 player
    Mpg123,
    /// Windows PowerShell media playback
    PowerShell,
}

impl PlayerCommand {
    const fn for_platform(platform: PlatformFamily) -> Self {
        match platform {
            PlatformFamily::MacOs => Self::Afplay,
            PlatformFamily::Linux => Self::Mpg123,
            PlatformFamily::Windows => Self::PowerShell,
        }
    }

    const fn program(self) -> &'static str {
        match self {
            Self::Afplay => "afplay",
            Self::Mpg123 => "mpg123",
            Self::PowerShell => "powershell",
        }
    }

    /// Arguments to play `path` with this player
    fn args(self, path: &Path) -> Vec<String> {
        let path = path.display().to_string();
        match self {
            Self::Afplay => vec![path],
            Self::Mpg123 => vec!["-q".to_string(), path],
            Self::PowerShell => vec![
                "-NoProfile".to_string(),
                "-Command".to_string(),
                format!(
                    "$p = New-Object System.Windows.Media.MediaPlayer; \
                     $p.Open('{path}'); $p.Play(); \
                     while ($p.NaturalDuration.HasTimeSpan -eq $false) {{ Start-Sleep -Milliseconds 100 }}; \
                     Start-Sleep -Seconds $p.NaturalDuration.TimeSpan.TotalSeconds"
                ),
            ],
        }
    }
}

/// Plays audio files with the platform's external player
pub struct AudioPlayback {
    command: PlayerCommand,
}

impl AudioPlayback {
    /// Create a playback instance for the given platform family
    #[must_use]
    pub const fn new(platform: PlatformFamily) -> Self {
        Self {
            command: PlayerCommand::for_platform(platform),
        }
    }
}

impl Player for AudioPlayback {
    fn play(&mut self, path: &Path) {
        let program = self.command.program();

        if which::which(program).is_err() {
            tracing::error!(player = program, "audio player not found");
            if self.command == PlayerCommand::Mpg123 {
                tracing::error!("install it with: sudo apt-get install mpg123");
            }
            return;
        }

        tracing::debug!(player = program, path = %path.display(), "playing audio");

        match Command::new(program).args(self.command.args(path)).status() {
            Ok(status) if status.success() => {}
            Ok(status) => {
                tracing::warn!(player = program, %status, "player exited with failure");
            }
            Err(e) => {
                tracing::warn!(player = program, error = %e, "failed to run player");
            }
        }
    }
}
