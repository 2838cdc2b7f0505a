//! Data models for the detection pipeline.
//!
//! One unit of work flows through these types: a candidate path is
//! classified, possibly converted (tracked by a `ConversionRecord`),
//! detected (producing a `DetectionResult`), and merged into `RunOutput`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Whether a candidate entered detection directly or via transcoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateKind {
    /// Already in the canonical audio format.
    Original,
    /// Produced by the transcode coordinator.
    Transcoded,
}

/// One candidate entering detection.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    /// The input path this candidate represents in the final output.
    pub source: PathBuf,
    /// The audio file to decode (equals `source` for originals, the
    /// temporary transcode output otherwise).
    pub audio: PathBuf,
    /// Origin of the audio path.
    pub kind: CandidateKind,
}

impl CandidateFile {
    /// A candidate that is already canonical audio.
    pub fn original(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        Self {
            audio: source.clone(),
            source,
            kind: CandidateKind::Original,
        }
    }

    /// A candidate backed by a transcoded temp file.
    pub fn transcoded(source: impl Into<PathBuf>, audio: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            audio: audio.into(),
            kind: CandidateKind::Transcoded,
        }
    }
}

/// Lifecycle of one conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionState {
    /// Created, not yet dispatched.
    Pending,
    /// The external process is running.
    Running,
    /// Zero exit status; output file is usable.
    Succeeded,
    /// Non-zero exit, spawn failure, or timeout.
    Failed,
}

/// One file's journey through the transcode coordinator.
///
/// Mutated only by the worker that owns the conversion; read by the
/// detection coordinator and the lifecycle manager once terminal.
#[derive(Debug, Clone)]
pub struct ConversionRecord {
    /// The file being converted.
    pub source_path: PathBuf,
    /// Collision-free temporary output path.
    pub output_path: PathBuf,
    /// Current state.
    pub state: ConversionState,
    /// Diagnostic text for failed conversions.
    pub error: Option<String>,
}

impl ConversionRecord {
    /// Create a pending record.
    pub fn new(source_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            output_path: output_path.into(),
            state: ConversionState::Pending,
            error: None,
        }
    }

    /// Mark the conversion as succeeded.
    pub fn mark_succeeded(&mut self) {
        self.state = ConversionState::Succeeded;
    }

    /// Mark the conversion as failed with diagnostic text.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.state = ConversionState::Failed;
        self.error = Some(error.into());
    }

    /// Whether the record reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            ConversionState::Succeeded | ConversionState::Failed
        )
    }

    /// Whether the output file is usable for detection.
    pub fn is_succeeded(&self) -> bool {
        self.state == ConversionState::Succeeded
    }
}

/// Offset value used when detection failed for a file.
pub const FAILED_OFFSET: f64 = -1.0;

/// Result of detecting the reference clip in one candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// The input file this result belongs to.
    pub file: PathBuf,
    /// Offset of the clip in seconds, rounded to two decimals.
    /// `FAILED_OFFSET` when `failed` is set.
    pub offset_seconds: f64,
    /// Whether decode or correlation failed for this candidate.
    pub failed: bool,
    /// Failure reason, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectionResult {
    /// A successful detection.
    pub fn found(file: impl Into<PathBuf>, offset_seconds: f64) -> Self {
        Self {
            file: file.into(),
            offset_seconds,
            failed: false,
            error: None,
        }
    }

    /// A failed detection; never aborts the batch.
    pub fn failure(file: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            offset_seconds: FAILED_OFFSET,
            failed: true,
            error: Some(error.into()),
        }
    }
}

/// Aggregated result of one run, keyed by input file path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutput {
    /// Offset in seconds per file that was successfully detected.
    pub offsets: BTreeMap<PathBuf, f64>,
    /// Failure reason per file whose detection failed.
    pub failures: BTreeMap<PathBuf, String>,
}

impl RunOutput {
    /// Merge one detection result into the output.
    pub fn merge(&mut self, result: DetectionResult) {
        if result.failed {
            self.failures.insert(
                result.file,
                result.error.unwrap_or_else(|| "detection failed".to_string()),
            );
        } else {
            self.offsets.insert(result.file, result.offset_seconds);
        }
    }

    /// Total number of files accounted for.
    pub fn len(&self) -> usize {
        self.offsets.len() + self.failures.len()
    }

    /// Whether no file produced a result.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty() && self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tracks_terminal_states() {
        let mut record = ConversionRecord::new("/a.mp4", "/tmp/a.wav");
        assert!(!record.is_terminal());

        record.state = ConversionState::Running;
        assert!(!record.is_terminal());

        record.mark_succeeded();
        assert!(record.is_terminal());
        assert!(record.is_succeeded());
    }

    #[test]
    fn failed_record_keeps_diagnostics() {
        let mut record = ConversionRecord::new("/a.mp4", "/tmp/a.wav");
        record.mark_failed("exit code 1: unsupported codec");

        assert!(record.is_terminal());
        assert!(!record.is_succeeded());
        assert!(record.error.as_deref().unwrap().contains("unsupported"));
    }

    #[test]
    fn run_output_separates_failures() {
        let mut output = RunOutput::default();
        output.merge(DetectionResult::found("/a.wav", 12.34));
        output.merge(DetectionResult::failure("/b.wav", "decode error"));

        assert_eq!(output.len(), 2);
        assert_eq!(output.offsets.get(&PathBuf::from("/a.wav")), Some(&12.34));
        assert!(output.failures.contains_key(&PathBuf::from("/b.wav")));
        assert!(!output.offsets.contains_key(&PathBuf::from("/b.wav")));
    }

    #[test]
    fn failure_result_uses_marker_offset() {
        let result = DetectionResult::failure("/x.wav", "boom");
        assert!(result.failed);
        assert_eq!(result.offset_seconds, FAILED_OFFSET);
    }

    #[test]
    fn run_output_serializes() {
        let mut output = RunOutput::default();
        output.merge(DetectionResult::found("/a.wav", 1.5));
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"/a.wav\":1.5"));
    }
}
