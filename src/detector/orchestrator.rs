//! Detection orchestrator.
//!
//! Composes the pipeline over one run: probe capabilities, load the
//! reference clip, classify inputs, convert non-canonical files, detect
//! across all eligible candidates, merge results, clean up. Cleanup runs on
//! every exit path, including a fatal error propagating out of any stage.
//! This is the only component that decides the concurrency bounds and
//! whether cleanup runs.

use std::path::PathBuf;
use std::sync::Arc;

use crate::analysis::{
    AudioDecoder, Correlator, FfmpegDecoder, FfmpegTranscoder, FftCorrelator, Transcoder,
};
use crate::config::Settings;
use crate::models::{CandidateFile, RunOutput};

use super::cleanup::TempRegistry;
use super::classify::classify;
use super::detect::{detect_all, DetectOptions};
use super::errors::{DetectorError, DetectorResult};
use super::transcode::{convert_all, TranscodeOptions};

/// State machine over one run.
///
/// Any state can jump straight to `Completed` on a fatal error; cleanup
/// still runs on that path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Initialized,
    ReferenceLoaded,
    Converted,
    Detected,
    Completed,
}

/// Detection orchestrator for one batch of candidate files.
pub struct Detector {
    /// The reference clip to search for.
    reference_path: PathBuf,
    /// Candidate files, already discovered and filtered by the caller.
    files: Vec<PathBuf>,
    /// External conversion capability.
    transcoder: Box<dyn Transcoder>,
    /// Waveform decoding capability.
    decoder: Box<dyn AudioDecoder>,
    /// Correlation peak-finding capability.
    correlator: Box<dyn Correlator>,
    /// Scratch location for temporary transcode outputs.
    scratch_dir: PathBuf,
    /// Search window per candidate, in seconds.
    window_secs: Option<f64>,
    /// Truncation of the reference clip, in seconds.
    reference_max_secs: Option<f64>,
    /// Bound `T` on simultaneous conversions.
    transcode_slots: usize,
    /// Bound `D` on simultaneous detections.
    detect_workers: usize,
    /// Extra arguments passed through to the transcoder.
    extra_ffmpeg_args: Vec<String>,
    /// Whether temp files are removed at run end.
    clean: bool,
    /// Current run state.
    state: RunState,
}

impl Detector {
    /// Create a detector with FFmpeg-backed defaults from settings.
    pub fn new(
        reference_path: impl Into<PathBuf>,
        files: Vec<PathBuf>,
        settings: &Settings,
    ) -> Self {
        let detection = &settings.detection;
        let concurrency = &settings.concurrency;

        Self {
            reference_path: reference_path.into(),
            files,
            transcoder: Box::new(FfmpegTranscoder::new(
                &detection.ffmpeg,
                concurrency.conversion_timeout_secs,
            )),
            decoder: Box::new(FfmpegDecoder::new(&detection.ffmpeg)),
            correlator: Box::new(FftCorrelator::new()),
            scratch_dir: PathBuf::from(&settings.paths.scratch_dir),
            window_secs: positive_secs(detection.window_secs),
            reference_max_secs: positive_secs(detection.reference_max_secs),
            transcode_slots: concurrency.transcode_slots,
            detect_workers: concurrency.detect_workers,
            extra_ffmpeg_args: detection.extra_ffmpeg_args.clone(),
            clean: detection.clean,
            state: RunState::Initialized,
        }
    }

    /// Substitute the conversion capability.
    pub fn with_transcoder(mut self, transcoder: Box<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    /// Substitute the decoding capability.
    pub fn with_decoder(mut self, decoder: Box<dyn AudioDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Substitute the correlation capability.
    pub fn with_correlator(mut self, correlator: Box<dyn Correlator>) -> Self {
        self.correlator = correlator;
        self
    }

    /// Current run state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run the full pipeline and return the aggregated offsets.
    ///
    /// Temporary transcode outputs are removed before this returns,
    /// whether the run completed or failed, unless cleanup is disabled.
    pub fn run(&mut self) -> DetectorResult<RunOutput> {
        let registry = TempRegistry::new(self.clean);

        let result = self.run_inner(&registry);

        let removed = registry.cleanup();
        if removed > 0 {
            tracing::info!("Removed {} temporary files", removed);
        }

        self.transition(RunState::Completed);
        if let Err(ref e) = result {
            tracing::error!("Run failed: {}", e);
        }
        result
    }

    fn run_inner(&mut self, registry: &TempRegistry) -> DetectorResult<RunOutput> {
        // Capability probe happens once, up front; a missing transcoder or
        // decoder aborts before any work is dispatched.
        self.transcoder
            .probe()
            .map_err(|e| DetectorError::init(format!("Transcoder unavailable: {}", e)))?;
        self.decoder
            .probe()
            .map_err(|e| DetectorError::init(format!("Decoder unavailable: {}", e)))?;

        tracing::info!("Loading reference {}", self.reference_path.display());
        let reference = self
            .decoder
            .decode(&self.reference_path, None, self.reference_max_secs)
            .map_err(|e| {
                DetectorError::reference_load(self.reference_path.display().to_string(), e.to_string())
            })?;
        let reference = Arc::new(reference);
        tracing::debug!(
            "Reference loaded: {:.2}s at {}Hz",
            reference.duration_secs,
            reference.sample_rate
        );
        self.transition(RunState::ReferenceLoaded);

        let classification = classify(&self.files);
        tracing::info!(
            "Found {} candidates: {} ready, {} to convert",
            self.files.len(),
            classification.ready.len(),
            classification.needs_conversion.len()
        );

        if !classification.needs_conversion.is_empty() {
            std::fs::create_dir_all(&self.scratch_dir).map_err(|e| {
                DetectorError::init(format!(
                    "Cannot create scratch dir {}: {}",
                    self.scratch_dir.display(),
                    e
                ))
            })?;
        }

        let records = convert_all(
            &classification.needs_conversion,
            &self.scratch_dir,
            self.transcoder.as_ref(),
            registry,
            &TranscodeOptions {
                slots: self.transcode_slots,
                window_secs: self.window_secs,
                extra_args: self.extra_ffmpeg_args.clone(),
            },
        )?;
        self.transition(RunState::Converted);

        // Only originals and successful conversions enter detection; a file
        // whose conversion failed is excluded entirely.
        let mut candidates: Vec<CandidateFile> = classification
            .ready
            .iter()
            .map(CandidateFile::original)
            .collect();
        for file in &classification.needs_conversion {
            if let Some(record) = records.get(file) {
                if record.is_succeeded() {
                    candidates.push(CandidateFile::transcoded(file, &record.output_path));
                }
            }
        }

        let results = detect_all(
            candidates,
            Arc::clone(&reference),
            self.decoder.as_ref(),
            self.correlator.as_ref(),
            &DetectOptions {
                workers: self.detect_workers,
                window_secs: self.window_secs,
            },
        )?;
        self.transition(RunState::Detected);

        let mut output = RunOutput::default();
        for result in results {
            output.merge(result);
        }

        tracing::info!(
            "Run finished: {} offsets, {} failures",
            output.offsets.len(),
            output.failures.len()
        );

        Ok(output)
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!("State {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Treat zero or negative durations as "unbounded".
fn positive_secs(secs: f64) -> Option<f64> {
    if secs > 0.0 {
        Some(secs)
    } else {
        None
    }
}
