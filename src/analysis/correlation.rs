//! Cross-correlation peak finding.
//!
//! The default correlator computes FFT-based cross-correlation using the
//! convolution theorem: corr(a,b) = IFFT(FFT(a) * conj(FFT(b))), then takes
//! the non-negative lag with maximal magnitude. That lag is where the
//! reference clip begins inside the candidate.

use rustfft::{num_complex::Complex, FftPlanner};

use super::types::{AnalysisError, AnalysisResult};

/// Correlation peak-finding capability.
///
/// Implementations return the lag (in samples) at which `reference` best
/// aligns inside `candidate`. Offset in seconds = lag / sample rate.
pub trait Correlator: Send + Sync {
    /// Name of this correlation method.
    fn name(&self) -> &str;

    /// Find the non-negative lag of the correlation magnitude peak.
    fn peak_lag(&self, candidate: &[f64], reference: &[f64]) -> AnalysisResult<i64>;
}

/// Standard cross-correlation using FFT.
pub struct FftCorrelator {
    /// Whether to normalize by signal energies before peak finding.
    normalize: bool,
}

impl FftCorrelator {
    /// Create a new FFT correlator.
    pub fn new() -> Self {
        Self { normalize: true }
    }

    /// Compute the cross-correlation of the candidate against the reference.
    ///
    /// Index `n` of the returned array is the correlation when the reference
    /// is shifted `n` samples into the candidate.
    fn compute_cross_correlation(&self, candidate: &[f64], reference: &[f64]) -> Vec<f64> {
        // Pad to power of 2 for efficient FFT. The buffer must hold the full
        // linear correlation (len1 + len2 - 1) to avoid circular wrap-around.
        let correlation_len = candidate.len() + reference.len() - 1;
        let fft_len = correlation_len.next_power_of_two();

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_len);
        let ifft = planner.plan_fft_inverse(fft_len);

        let mut cand_complex: Vec<Complex<f64>> = candidate
            .iter()
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        cand_complex.resize(fft_len, Complex::new(0.0, 0.0));

        let mut ref_complex: Vec<Complex<f64>> = reference
            .iter()
            .map(|&x| Complex::new(x, 0.0))
            .collect();
        ref_complex.resize(fft_len, Complex::new(0.0, 0.0));

        fft.process(&mut cand_complex);
        fft.process(&mut ref_complex);

        // Candidate times conjugate of reference = correlation in frequency
        // domain, with lag n at index n.
        let mut product: Vec<Complex<f64>> = cand_complex
            .iter()
            .zip(ref_complex.iter())
            .map(|(a, b)| a * b.conj())
            .collect();

        ifft.process(&mut product);

        let scale = 1.0 / fft_len as f64;
        let mut correlation: Vec<f64> = product.iter().map(|c| c.re * scale).collect();

        if self.normalize {
            let cand_energy: f64 = candidate.iter().map(|x| x * x).sum();
            let ref_energy: f64 = reference.iter().map(|x| x * x).sum();
            let norm_factor = (cand_energy * ref_energy).sqrt();

            if norm_factor > 1e-10 {
                for val in &mut correlation {
                    *val /= norm_factor;
                }
            }
        }

        correlation
    }
}

impl Default for FftCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator for FftCorrelator {
    fn name(&self) -> &str {
        "FFT"
    }

    fn peak_lag(&self, candidate: &[f64], reference: &[f64]) -> AnalysisResult<i64> {
        if candidate.is_empty() || reference.is_empty() {
            return Err(AnalysisError::InvalidAudio(
                "Empty sample sequence".to_string(),
            ));
        }

        let correlation = self.compute_cross_correlation(candidate, reference);

        // The clip starts somewhere inside the candidate, so only
        // non-negative lags up to the candidate length are meaningful.
        let (max_idx, _) = correlation[..candidate.len()]
            .iter()
            .map(|v| v.abs())
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or_else(|| {
                AnalysisError::CorrelationError("Empty correlation output".to_string())
            })?;

        Ok(max_idx as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-random noise; sharp autocorrelation peak.
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
    fn identical_signals_have_zero_lag() {
        let correlator = FftCorrelator::new();
        let signal = noise(4000, 42);

        let lag = correlator.peak_lag(&signal, &signal).unwrap();
        assert_eq!(lag, 0);
    }

    #[test]
    fn embedded_clip_found_at_insertion_point() {
        let correlator = FftCorrelator::new();
        let clip = noise(1000, 7);

        let insert_at = 2500;
        let mut candidate = vec![0.0; 8000];
        candidate[insert_at..insert_at + clip.len()].copy_from_slice(&clip);

        let lag = correlator.peak_lag(&candidate, &clip).unwrap();
        assert_eq!(lag, insert_at as i64);
    }

    #[test]
    fn clip_at_start_has_zero_lag() {
        let correlator = FftCorrelator::new();
        let clip = noise(500, 99);

        let mut candidate = clip.clone();
        candidate.extend(vec![0.0; 3000]);

        let lag = correlator.peak_lag(&candidate, &clip).unwrap();
        assert_eq!(lag, 0);
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let correlator = FftCorrelator::new();
        let signal = noise(100, 3);

        assert!(correlator.peak_lag(&[], &signal).is_err());
        assert!(correlator.peak_lag(&signal, &[]).is_err());
    }

    #[test]
    fn peak_survives_surrounding_noise() {
        let correlator = FftCorrelator::new();
        let clip = noise(1200, 11);

        let insert_at = 4321;
        // Background noise from a different seed, clip layered on top.
        let mut candidate = noise(10000, 555)
            .into_iter()
            .map(|v| v * 0.1)
            .collect::<Vec<_>>();
        for (i, &v) in clip.iter().enumerate() {
            candidate[insert_at + i] += v;
        }

        let lag = correlator.peak_lag(&candidate, &clip).unwrap();
        assert_eq!(lag, insert_at as i64);
    }
}
