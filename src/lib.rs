//! clipfind - locate a reference audio clip inside audio/video files.
//!
//! This crate contains all detection logic with no CLI dependencies in the
//! library surface. The pipeline: discover candidate files, transcode
//! non-WAV inputs through FFmpeg under a bounded pool, cross-correlate every
//! candidate against the reference clip under a second bounded pool, and
//! return a per-file offset map. Temporary transcode outputs are removed on
//! every exit path.

pub mod analysis;
pub mod config;
pub mod detector;
pub mod discovery;
pub mod logging;
pub mod models;
pub mod output;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
