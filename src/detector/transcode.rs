//! Transcode coordinator.
//!
//! Converts every non-canonical input to WAV under a dedicated pool of `T`
//! threads, each blocked on one external conversion process, so at most `T`
//! conversions run at once. The pool-scoped parallel iterator returns only
//! when every dispatched conversion reached a terminal state, which is the
//! barrier the detection stage relies on. A single failure is recorded and
//! logged; it never aborts sibling conversions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::analysis::Transcoder;
use crate::models::{ConversionRecord, ConversionState};

use super::cleanup::{temp_output_path, TempRegistry};
use super::errors::{DetectorError, DetectorResult};

/// Options for one conversion batch.
#[derive(Debug, Clone)]
pub struct TranscodeOptions {
    /// Maximum simultaneous external conversion processes.
    pub slots: usize,
    /// Truncate conversion to the first N seconds of audio.
    pub window_secs: Option<f64>,
    /// Extra arguments passed through to the transcoder.
    pub extra_args: Vec<String>,
}

/// Convert every file to the canonical format, bounded to `slots`
/// concurrent conversions.
///
/// Every output path is registered with `registry` before dispatch, so
/// cleanup covers partially-written files from failed conversions too.
/// Returns one terminal record per input file, keyed by source path.
pub fn convert_all(
    files: &[PathBuf],
    scratch_dir: &Path,
    transcoder: &dyn Transcoder,
    registry: &TempRegistry,
    options: &TranscodeOptions,
) -> DetectorResult<HashMap<PathBuf, ConversionRecord>> {
    if files.is_empty() {
        return Ok(HashMap::new());
    }

    // Records and registry entries exist before any worker starts.
    let mut records: Vec<ConversionRecord> = Vec::with_capacity(files.len());
    for file in files {
        let output = temp_output_path(scratch_dir);
        registry.register(&output);
        records.push(ConversionRecord::new(file, output));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.slots.max(1))
        .thread_name(|i| format!("transcode-{}", i))
        .build()
        .map_err(|e| DetectorError::init(format!("Failed to build transcode pool: {}", e)))?;

    tracing::info!(
        "Converting {} files ({} slots)",
        files.len(),
        options.slots.max(1)
    );

    let results: HashMap<PathBuf, ConversionRecord> = pool.install(|| {
        records
            .into_par_iter()
            .map(|record| (record.source_path.clone(), run_conversion(record, transcoder, options)))
            .collect()
    });

    debug_assert!(results.values().all(|r| r.is_terminal()));
    tracing::debug!("Conversions complete");

    Ok(results)
}

/// Drive one conversion to a terminal state. Each worker owns its record.
fn run_conversion(
    mut record: ConversionRecord,
    transcoder: &dyn Transcoder,
    options: &TranscodeOptions,
) -> ConversionRecord {
    record.state = ConversionState::Running;
    tracing::debug!(
        "Converting {} to {}",
        record.source_path.display(),
        record.output_path.display()
    );

    match transcoder.transcode(
        &record.source_path,
        &record.output_path,
        options.window_secs,
        &options.extra_args,
    ) {
        Ok(()) => {
            tracing::debug!(
                "Converted {} to {}",
                record.source_path.display(),
                record.output_path.display()
            );
            record.mark_succeeded();
        }
        Err(e) => {
            tracing::error!("Error converting {}: {}", record.source_path.display(), e);
            record.mark_failed(e.to_string());
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisError, AnalysisResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Transcoder that records calls and fails for selected inputs.
    struct RecordingTranscoder {
        calls: AtomicUsize,
        fail_for: Vec<PathBuf>,
    }

    impl Transcoder for RecordingTranscoder {
        fn transcode(
            &self,
            input: &Path,
            output: &Path,
            _max_seconds: Option<f64>,
            _extra_args: &[String],
        ) -> AnalysisResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_for.iter().any(|p| p == input) {
                return Err(AnalysisError::TranscodeFailed {
                    exit_code: 1,
                    diagnostics: "synthetic failure".to_string(),
                });
            }
            std::fs::write(output, b"wav").map_err(AnalysisError::IoError)?;
            Ok(())
        }
    }

    fn options(slots: usize) -> TranscodeOptions {
        TranscodeOptions {
            slots,
            window_secs: Some(60.0),
            extra_args: Vec::new(),
        }
    }

    #[test]
    fn empty_batch_returns_no_records() {
        let dir = tempdir().unwrap();
        let registry = TempRegistry::new(true);
        let transcoder = RecordingTranscoder {
            calls: AtomicUsize::new(0),
            fail_for: Vec::new(),
        };

        let records =
            convert_all(&[], dir.path(), &transcoder, &registry, &options(2)).unwrap();
        assert!(records.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn all_records_reach_terminal_state() {
        let dir = tempdir().unwrap();
        let registry = TempRegistry::new(true);
        let files: Vec<PathBuf> = (0..4).map(|i| PathBuf::from(format!("/in/{}.mp4", i))).collect();
        let transcoder = RecordingTranscoder {
            calls: AtomicUsize::new(0),
            fail_for: vec![PathBuf::from("/in/2.mp4")],
        };

        let records =
            convert_all(&files, dir.path(), &transcoder, &registry, &options(2)).unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(transcoder.calls.load(Ordering::SeqCst), 4);
        assert!(records.values().all(|r| r.is_terminal()));
        assert!(!records[&PathBuf::from("/in/2.mp4")].is_succeeded());
        assert_eq!(
            records.values().filter(|r| r.is_succeeded()).count(),
            3
        );
    }

    #[test]
    fn failure_carries_diagnostics() {
        let dir = tempdir().unwrap();
        let registry = TempRegistry::new(true);
        let files = vec![PathBuf::from("/in/bad.mkv")];
        let transcoder = RecordingTranscoder {
            calls: AtomicUsize::new(0),
            fail_for: files.clone(),
        };

        let records =
            convert_all(&files, dir.path(), &transcoder, &registry, &options(1)).unwrap();

        let record = &records[&files[0]];
        assert_eq!(record.state, ConversionState::Failed);
        assert!(record.error.as_deref().unwrap().contains("synthetic failure"));
    }

    #[test]
    fn outputs_are_registered_before_dispatch() {
        let dir = tempdir().unwrap();
        let registry = TempRegistry::new(true);
        let files = vec![PathBuf::from("/in/a.mp4"), PathBuf::from("/in/b.mp4")];
        let transcoder = RecordingTranscoder {
            calls: AtomicUsize::new(0),
            fail_for: files.clone(),
        };

        // Both conversions fail, yet both outputs are registered.
        convert_all(&files, dir.path(), &transcoder, &registry, &options(2)).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn output_paths_are_unique_per_record() {
        let dir = tempdir().unwrap();
        let registry = TempRegistry::new(true);
        let files: Vec<PathBuf> = (0..8).map(|i| PathBuf::from(format!("/in/{}.avi", i))).collect();
        let transcoder = RecordingTranscoder {
            calls: AtomicUsize::new(0),
            fail_for: Vec::new(),
        };

        let records =
            convert_all(&files, dir.path(), &transcoder, &registry, &options(4)).unwrap();

        let mut outputs: Vec<&PathBuf> = records.values().map(|r| &r.output_path).collect();
        outputs.sort();
        outputs.dedup();
        assert_eq!(outputs.len(), 8);
    }
}
