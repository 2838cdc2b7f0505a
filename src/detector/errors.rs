//! Error types for the detection orchestrator.
//!
//! Only fatal initialization problems surface as run-terminating errors.
//! Per-file conversion and detection failures stay inside their
//! `ConversionRecord` / `DetectionResult` and never abort the batch.

use thiserror::Error;

/// Fatal errors that terminate an entire run.
#[derive(Error, Debug)]
pub enum DetectorError {
    /// A required capability is unavailable or a pool could not be built.
    #[error("Initialization failed: {0}")]
    Init(String),

    /// The reference clip could not be loaded.
    #[error("Failed to load reference '{path}': {message}")]
    ReferenceLoad { path: String, message: String },
}

impl DetectorError {
    /// Create an initialization error.
    pub fn init(message: impl Into<String>) -> Self {
        Self::Init(message.into())
    }

    /// Create a reference load error.
    pub fn reference_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReferenceLoad {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for orchestrator operations.
pub type DetectorResult<T> = Result<T, DetectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_load_displays_context() {
        let err = DetectorError::reference_load("/clips/intro.wav", "no audio stream");
        let msg = err.to_string();
        assert!(msg.contains("/clips/intro.wav"));
        assert!(msg.contains("no audio stream"));
    }
}
