//! Configuration management.
//!
//! TOML-based configuration with logical sections and atomic file writes
//! (write to temp, then rename).

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConcurrencySettings, DetectionSettings, LoggingSettings, PathSettings, Settings,
};
