//! Detection coordinator.
//!
//! Runs correlation detection over every eligible candidate under a
//! dedicated pool of `D` workers. Each worker decodes its candidate at the
//! reference sample rate, restricted to the search window, then asks the
//! correlator for the peak lag. One candidate's decode or correlation
//! failure becomes a failed `DetectionResult`; siblings are unaffected.
//! Result order is unspecified; aggregation is by file path.

use std::sync::Arc;

use rayon::prelude::*;

use crate::analysis::{AudioData, AudioDecoder, Correlator};
use crate::models::{CandidateFile, DetectionResult};

use super::errors::{DetectorError, DetectorResult};

/// Options for one detection batch.
#[derive(Debug, Clone)]
pub struct DetectOptions {
    /// Maximum simultaneous correlation workers.
    pub workers: usize,
    /// Decode at most the first N seconds of each candidate.
    pub window_secs: Option<f64>,
}

/// Detect the reference clip in every candidate, bounded to `workers`
/// parallel detections.
///
/// The reference is shared read-only; nothing mutates it after load.
pub fn detect_all(
    candidates: Vec<CandidateFile>,
    reference: Arc<AudioData>,
    decoder: &dyn AudioDecoder,
    correlator: &dyn Correlator,
    options: &DetectOptions,
) -> DetectorResult<Vec<DetectionResult>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers.max(1))
        .thread_name(|i| format!("detect-{}", i))
        .build()
        .map_err(|e| DetectorError::init(format!("Failed to build detection pool: {}", e)))?;

    tracing::info!(
        "Detecting in {} candidates ({} workers, method {})",
        candidates.len(),
        options.workers.max(1),
        correlator.name()
    );

    let results = pool.install(|| {
        candidates
            .into_par_iter()
            .map(|candidate| {
                detect_one(&candidate, &reference, decoder, correlator, options)
            })
            .collect()
    });

    tracing::debug!("Detection complete");

    Ok(results)
}

/// Detect the reference clip in one candidate.
fn detect_one(
    candidate: &CandidateFile,
    reference: &AudioData,
    decoder: &dyn AudioDecoder,
    correlator: &dyn Correlator,
    options: &DetectOptions,
) -> DetectionResult {
    let audio = match decoder.decode(
        &candidate.audio,
        Some(reference.sample_rate),
        options.window_secs,
    ) {
        Ok(audio) => audio,
        Err(e) => {
            tracing::error!("Decode failed for {}: {}", candidate.source.display(), e);
            return DetectionResult::failure(&candidate.source, e.to_string());
        }
    };

    match correlator.peak_lag(&audio.samples, &reference.samples) {
        Ok(lag) => {
            let offset = round_secs(lag as f64 / reference.sample_rate as f64);
            tracing::debug!(
                "Found clip in {} at {:.2}s (lag {} samples)",
                candidate.source.display(),
                offset,
                lag
            );
            DetectionResult::found(&candidate.source, offset)
        }
        Err(e) => {
            tracing::error!(
                "Correlation failed for {}: {}",
                candidate.source.display(),
                e
            );
            DetectionResult::failure(&candidate.source, e.to_string())
        }
    }
}

/// Round an offset to two decimal places.
fn round_secs(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisError, AnalysisResult, FftCorrelator};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    /// Decoder serving canned waveforms keyed by path.
    struct MapDecoder {
        signals: HashMap<PathBuf, Vec<f64>>,
        sample_rate: u32,
    }

    impl AudioDecoder for MapDecoder {
        fn decode(
            &self,
            path: &Path,
            target_sample_rate: Option<u32>,
            _max_duration: Option<f64>,
        ) -> AnalysisResult<AudioData> {
            let rate = target_sample_rate.unwrap_or(self.sample_rate);
            self.signals
                .get(path)
                .map(|samples| AudioData::new(samples.clone(), rate))
                .ok_or_else(|| {
                    AnalysisError::DecodeError(format!("no signal for {}", path.display()))
                })
        }
    }

    fn noise(len: usize, mut seed: u64) -> Vec<f64> {
        (0..len)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                (seed as f64 / u64::MAX as f64) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn round_trip_candidate_detects_zero_offset() {
        let rate = 8000;
        let clip = noise(rate as usize, 21);
        let reference = Arc::new(AudioData::new(clip.clone(), rate));

        let mut signals = HashMap::new();
        signals.insert(PathBuf::from("/a.wav"), clip);
        let decoder = MapDecoder {
            signals,
            sample_rate: rate,
        };

        let results = detect_all(
            vec![CandidateFile::original("/a.wav")],
            reference,
            &decoder,
            &FftCorrelator::new(),
            &DetectOptions {
                workers: 1,
                window_secs: None,
            },
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert!(!results[0].failed);
        assert_eq!(results[0].offset_seconds, 0.0);
    }

    #[test]
    fn failed_decode_yields_failed_result_without_stopping_batch() {
        let rate = 8000;
        let clip = noise(2000, 5);
        let reference = Arc::new(AudioData::new(clip.clone(), rate));

        let mut candidate = vec![0.0; 8000];
        candidate[4000..6000].copy_from_slice(&clip);

        let mut signals = HashMap::new();
        signals.insert(PathBuf::from("/good.wav"), candidate);
        // "/broken.wav" has no signal, so decode fails.
        let decoder = MapDecoder {
            signals,
            sample_rate: rate,
        };

        let results = detect_all(
            vec![
                CandidateFile::original("/good.wav"),
                CandidateFile::original("/broken.wav"),
            ],
            reference,
            &decoder,
            &FftCorrelator::new(),
            &DetectOptions {
                workers: 2,
                window_secs: None,
            },
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        let good = results.iter().find(|r| r.file == Path::new("/good.wav")).unwrap();
        let broken = results
            .iter()
            .find(|r| r.file == Path::new("/broken.wav"))
            .unwrap();

        assert!(!good.failed);
        assert_eq!(good.offset_seconds, 0.5); // 4000 samples at 8kHz
        assert!(broken.failed);
        assert!(broken.error.as_deref().unwrap().contains("no signal"));
    }

    #[test]
    fn offsets_round_to_two_decimals() {
        assert_eq!(round_secs(12.3449), 12.34);
        assert_eq!(round_secs(12.345), 12.35);
        assert_eq!(round_secs(0.0), 0.0);
    }
}
