//! Audio analysis: decoding, transcoding, and correlation.
//!
//! The orchestrator consumes the three capabilities defined here as traits:
//!
//! 1. **Transcoder**: convert a media file to the canonical WAV container,
//!    truncated to the search window.
//! 2. **AudioDecoder**: decode a file to mono f64 samples at a target rate.
//! 3. **Correlator**: find the lag at which two sample sequences best align.
//!
//! `ffmpeg` provides the default transcoder/decoder backed by the FFmpeg
//! executable; `correlation` provides the default FFT correlator. Tests and
//! embedders can substitute any of the three.

pub mod correlation;
pub mod ffmpeg;
pub mod types;

use std::path::Path;

pub use correlation::{Correlator, FftCorrelator};
pub use ffmpeg::{probe_ffmpeg, FfmpegDecoder, FfmpegTranscoder};
pub use types::{AnalysisError, AnalysisResult, AudioData};

/// External conversion capability.
///
/// Implementations write a canonical WAV file at `output`, truncated to the
/// first `max_seconds` of audio when given. A failure must carry the
/// process's diagnostic output.
pub trait Transcoder: Send + Sync {
    /// Verify the capability is usable. Called once at orchestrator init.
    fn probe(&self) -> AnalysisResult<()> {
        Ok(())
    }

    /// Convert `input` into a canonical WAV at `output`.
    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        max_seconds: Option<f64>,
        extra_args: &[String],
    ) -> AnalysisResult<()>;
}

/// Waveform decoding capability.
pub trait AudioDecoder: Send + Sync {
    /// Verify the capability is usable. Called once at orchestrator init.
    fn probe(&self) -> AnalysisResult<()> {
        Ok(())
    }

    /// Decode `path` to mono samples.
    ///
    /// `target_sample_rate` of `None` keeps the file's native rate.
    /// `max_duration` of `None` decodes the entire file.
    fn decode(
        &self,
        path: &Path,
        target_sample_rate: Option<u32>,
        max_duration: Option<f64>,
    ) -> AnalysisResult<AudioData>;
}
