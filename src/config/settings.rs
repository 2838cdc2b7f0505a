//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field carries a serde default so partial config files load cleanly.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Detection settings.
    #[serde(default)]
    pub detection: DetectionSettings,

    /// Concurrency bounds.
    #[serde(default)]
    pub concurrency: ConcurrencySettings,
}

/// Path configuration for scratch space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder for temporary transcoded files.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,
}

fn default_scratch_dir() -> String {
    std::env::temp_dir().display().to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum log level to output.
    #[serde(default)]
    pub level: LogLevel,
}

/// Detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionSettings {
    /// Seconds of each candidate to search in. Conversion and decoding are
    /// both truncated to this window.
    #[serde(default = "default_window_secs")]
    pub window_secs: f64,

    /// Seconds of the reference clip to load. Zero or negative means the
    /// entire file.
    #[serde(default = "default_reference_max_secs")]
    pub reference_max_secs: f64,

    /// Path to the ffmpeg executable.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// Extra arguments appended to every ffmpeg conversion.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,

    /// Remove temporary transcoded files when a run ends.
    #[serde(default = "default_true")]
    pub clean: bool,
}

fn default_window_secs() -> f64 {
    60.0
}

fn default_reference_max_secs() -> f64 {
    -1.0
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            reference_max_secs: default_reference_max_secs(),
            ffmpeg: default_ffmpeg(),
            extra_ffmpeg_args: Vec::new(),
            clean: true,
        }
    }
}

/// Concurrency bounds for the two pipeline domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencySettings {
    /// Maximum simultaneous external conversion processes.
    #[serde(default = "default_pool_size")]
    pub transcode_slots: usize,

    /// Maximum simultaneous correlation workers.
    #[serde(default = "default_pool_size")]
    pub detect_workers: usize,

    /// Maximum seconds to wait for one conversion before killing it.
    #[serde(default = "default_conversion_timeout")]
    pub conversion_timeout_secs: u64,
}

/// Half the available cores, at least one.
fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| (n.get() / 2).max(1))
        .unwrap_or(1)
}

fn default_conversion_timeout() -> u64 {
    600
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            transcode_slots: default_pool_size(),
            detect_workers: default_pool_size(),
            conversion_timeout_secs: default_conversion_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[detection]"));
        assert!(toml.contains("window_secs"));
    }

    #[test]
    fn settings_round_trip() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.detection.window_secs, settings.detection.window_secs);
        assert_eq!(
            parsed.concurrency.transcode_slots,
            settings.concurrency.transcode_slots
        );
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[detection]\nwindow_secs = 30.0";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        // Custom value preserved
        assert_eq!(parsed.detection.window_secs, 30.0);
        // Defaults applied for missing
        assert_eq!(parsed.detection.ffmpeg, "ffmpeg");
        assert!(parsed.detection.clean);
        assert_eq!(parsed.concurrency.conversion_timeout_secs, 600);
    }

    #[test]
    fn pool_size_default_is_nonzero() {
        assert!(default_pool_size() >= 1);
    }
}
