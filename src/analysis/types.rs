//! Core types for audio analysis.

/// Audio data decoded from a source file.
///
/// The reference clip and every candidate waveform use this shape. The
/// reference instance is loaded once per run and never mutated after.
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Audio samples as f64 (mono).
    pub samples: Vec<f64>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl AudioData {
    /// Create new audio data from samples.
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        let duration_secs = samples.len() as f64 / sample_rate as f64;
        Self {
            samples,
            sample_rate,
            duration_secs,
        }
    }

    /// Get the number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if audio data is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Error types for analysis operations.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// FFmpeg could not be spawned or driven.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// Decoding a waveform failed.
    #[error("Decode failed: {0}")]
    DecodeError(String),

    /// Correlation failed.
    #[error("Correlation failed: {0}")]
    CorrelationError(String),

    /// Invalid audio data.
    #[error("Invalid audio data: {0}")]
    InvalidAudio(String),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Source file not found.
    #[error("Source file not found: {0}")]
    SourceNotFound(String),

    /// An external conversion exited non-zero.
    #[error("Transcode failed with exit code {exit_code}: {diagnostics}")]
    TranscodeFailed { exit_code: i32, diagnostics: String },

    /// An external conversion exceeded its wait bound and was killed.
    #[error("Transcode timed out after {secs}s")]
    TranscodeTimeout { secs: u64 },
}

/// Type alias for analysis results.
pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_data_computes_duration() {
        let audio = AudioData::new(vec![0.0; 48000], 48000);
        assert_eq!(audio.len(), 48000);
        assert!((audio.duration_secs - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_audio_is_empty() {
        let audio = AudioData::new(vec![], 16000);
        assert!(audio.is_empty());
        assert_eq!(audio.duration_secs, 0.0);
    }

    #[test]
    fn transcode_error_displays_context() {
        let err = AnalysisError::TranscodeFailed {
            exit_code: 1,
            diagnostics: "unsupported codec".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("unsupported codec"));
    }
}
