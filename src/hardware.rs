//! Hardware profile detection
//!
//! Computed once at startup and passed into synthesis model selection, so
//! capability checks never hide behind process-wide globals.

/// Platform family, as far as audio tooling is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    /// macOS (`afplay` player, Metal acceleration on Apple Silicon)
    MacOs,
    /// Linux and other unixes (`mpg123` player, CUDA acceleration)
    Linux,
    /// Windows (PowerShell media player, CUDA acceleration)
    Windows,
}

/// Hardware capabilities relevant to synthesis model selection
#[derive(Debug, Clone, Copy)]
pub struct HardwareProfile {
    /// Platform family
    pub platform: PlatformFamily,

    /// Whether hardware acceleration is available
    pub accelerated: bool,
}

impl HardwareProfile {
    /// Detect the hardware profile for this process
    #[must_use]
    pub fn detect() -> Self {
        let platform = match std::env::consts::OS {
            "macos" => PlatformFamily::MacOs,
            "windows" => PlatformFamily::Windows,
            _ => PlatformFamily::Linux,
        };

        let accelerated = match platform {
            // Apple Silicon ships Metal; Intel Macs have no usable GPU here
            PlatformFamily::MacOs => std::env::consts::ARCH == "aarch64",
            // Presence of the NVIDIA driver tooling is the CUDA signal
            PlatformFamily::Linux | PlatformFamily::Windows => {
                which::which("nvidia-smi").is_ok()
            }
        };

        tracing::info!(?platform, accelerated, "hardware profile detected");

        Self {
            platform,
            accelerated,
        }
    }

    /// Whether this configuration should stick to lightweight synthesis models
    ///
    /// Matches the constrained case of a Mac without acceleration; heavier
    /// multilingual models are not worth attempting there.
    #[must_use]
    pub const fn is_constrained(&self) -> bool {
        matches!(self.platform, PlatformFamily::MacOs) && !self.accelerated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constrained_only_on_unaccelerated_mac() {
        let mac_cpu = HardwareProfile {
            platform: PlatformFamily::MacOs,
            accelerated: false,
        };
        assert!(mac_cpu.is_constrained());

        let mac_gpu = HardwareProfile {
            platform: PlatformFamily::MacOs,
            accelerated: true,
        };
        assert!(!mac_gpu.is_constrained());

        let linux_cpu = HardwareProfile {
            platform: PlatformFamily::Linux,
            accelerated: false,
        };
        assert!(!linux_cpu.is_constrained());
    }
}
