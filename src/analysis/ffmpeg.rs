//! FFmpeg-backed capability implementations.
//!
//! Decoding pipes mono f64le samples out of FFmpeg at the requested rate;
//! transcoding writes the canonical WAV container, truncated to the search
//! window. Both capabilities probe the executable once at orchestrator init.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use super::types::{AnalysisError, AnalysisResult, AudioData};
use super::{AudioDecoder, Transcoder};

/// Poll interval while waiting for an external conversion.
const WAIT_POLL: Duration = Duration::from_millis(100);

/// Check that the ffmpeg executable at `ffmpeg` can run.
pub fn probe_ffmpeg(ffmpeg: &str) -> AnalysisResult<()> {
    let output = Command::new(ffmpeg)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| AnalysisError::FfmpegError(format!("'{}' not runnable: {}", ffmpeg, e)))?;

    if !output.success() {
        return Err(AnalysisError::FfmpegError(format!(
            "'{}' exited with {:?} during probe",
            ffmpeg,
            output.code()
        )));
    }

    Ok(())
}

/// Audio decoder driving the FFmpeg executable.
pub struct FfmpegDecoder {
    /// Path to the ffmpeg executable.
    ffmpeg: String,
    /// Path to the ffprobe executable (for native sample rate lookup).
    ffprobe: String,
}

impl FfmpegDecoder {
    /// Create a decoder using the given ffmpeg executable.
    pub fn new(ffmpeg: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: "ffprobe".to_string(),
        }
    }

    /// Override the ffprobe executable path.
    pub fn with_ffprobe(mut self, ffprobe: impl Into<String>) -> Self {
        self.ffprobe = ffprobe.into();
        self
    }

    /// Read the native sample rate of the first audio stream.
    fn native_sample_rate(&self, path: &Path) -> AnalysisResult<u32> {
        let output = Command::new(&self.ffprobe)
            .arg("-v")
            .arg("error")
            .arg("-select_streams")
            .arg("a:0")
            .arg("-show_entries")
            .arg("stream=sample_rate")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path)
            .output()
            .map_err(|e| AnalysisError::FfmpegError(format!("Failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(AnalysisError::FfmpegError(format!(
                "ffprobe failed to read sample rate of {}",
                path.display()
            )));
        }

        let rate_str = String::from_utf8_lossy(&output.stdout);
        rate_str.trim().parse::<u32>().map_err(|e| {
            AnalysisError::FfmpegError(format!("Failed to parse sample rate: {}", e))
        })
    }
}

impl AudioDecoder for FfmpegDecoder {
    fn probe(&self) -> AnalysisResult<()> {
        probe_ffmpeg(&self.ffmpeg)
    }

    fn decode(
        &self,
        path: &Path,
        target_sample_rate: Option<u32>,
        max_duration: Option<f64>,
    ) -> AnalysisResult<AudioData> {
        if !path.exists() {
            return Err(AnalysisError::SourceNotFound(path.display().to_string()));
        }

        let sample_rate = match target_sample_rate {
            Some(rate) => rate,
            None => self.native_sample_rate(path)?,
        };

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-i").arg(path);

        if let Some(duration) = max_duration {
            cmd.arg("-t").arg(format!("{:.3}", duration));
        }

        cmd.arg("-vn") // No video
            .arg("-ac")
            .arg("1") // Mono
            .arg("-ar")
            .arg(sample_rate.to_string())
            .arg("-f")
            .arg("f64le") // 64-bit float, little endian
            .arg("-acodec")
            .arg("pcm_f64le")
            .arg("pipe:1");

        cmd.stderr(Stdio::null()).stdout(Stdio::piped());

        tracing::debug!("Running FFmpeg (decode): {:?}", cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| AnalysisError::FfmpegError(format!("Failed to spawn FFmpeg: {}", e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| AnalysisError::FfmpegError("Failed to capture FFmpeg stdout".to_string()))?;

        let mut buffer = Vec::new();
        stdout
            .read_to_end(&mut buffer)
            .map_err(|e| AnalysisError::FfmpegError(format!("Failed to read FFmpeg output: {}", e)))?;

        let status = child
            .wait()
            .map_err(|e| AnalysisError::FfmpegError(format!("FFmpeg process error: {}", e)))?;

        if !status.success() {
            return Err(AnalysisError::DecodeError(format!(
                "FFmpeg exited with code {:?} decoding {}",
                status.code(),
                path.display()
            )));
        }

        let samples = bytes_to_f64_samples(&buffer);

        if samples.is_empty() {
            return Err(AnalysisError::DecodeError(format!(
                "No audio samples decoded from {}",
                path.display()
            )));
        }

        tracing::debug!(
            "Decoded {} samples ({:.2}s) from {}",
            samples.len(),
            samples.len() as f64 / sample_rate as f64,
            path.display()
        );

        Ok(AudioData::new(samples, sample_rate))
    }
}

/// Transcoder driving the FFmpeg executable with a bounded wait.
pub struct FfmpegTranscoder {
    /// Path to the ffmpeg executable.
    ffmpeg: String,
    /// Maximum wall time for one conversion before the child is killed.
    timeout: Duration,
}

impl FfmpegTranscoder {
    /// Create a transcoder using the given ffmpeg executable.
    pub fn new(ffmpeg: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Wait for the child, polling at bounded latency, killing on timeout.
    fn wait_bounded(&self, child: &mut Child) -> AnalysisResult<std::process::ExitStatus> {
        let deadline = Instant::now() + self.timeout;

        loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|e| AnalysisError::FfmpegError(format!("FFmpeg process error: {}", e)))?
            {
                return Ok(status);
            }

            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(AnalysisError::TranscodeTimeout {
                    secs: self.timeout.as_secs(),
                });
            }

            std::thread::sleep(WAIT_POLL);
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn probe(&self) -> AnalysisResult<()> {
        probe_ffmpeg(&self.ffmpeg)
    }

    fn transcode(
        &self,
        input: &Path,
        output: &Path,
        max_seconds: Option<f64>,
        extra_args: &[String],
    ) -> AnalysisResult<()> {
        if !input.exists() {
            return Err(AnalysisError::SourceNotFound(input.display().to_string()));
        }

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-y").arg("-loglevel").arg("error");

        if let Some(secs) = max_seconds {
            cmd.arg("-to").arg(format!("{:.3}", secs));
        }

        cmd.arg("-i").arg(input);
        cmd.args(extra_args);
        cmd.arg(output);

        cmd.stdout(Stdio::null()).stderr(Stdio::piped());

        tracing::debug!("Running FFmpeg (transcode): {:?}", cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| AnalysisError::FfmpegError(format!("Failed to spawn FFmpeg: {}", e)))?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| AnalysisError::FfmpegError("Failed to capture FFmpeg stderr".to_string()))?;

        // Drain stderr while waiting; a child emitting more than the pipe
        // buffer would otherwise block on write and never exit. The reader
        // finishes once the child exits or is killed.
        let reader = std::thread::spawn(move || {
            let mut diagnostics = String::new();
            let _ = stderr.read_to_string(&mut diagnostics);
            diagnostics
        });

        let status = self.wait_bounded(&mut child);
        let diagnostics = reader.join().unwrap_or_default();
        let status = status?;

        if !status.success() {
            return Err(AnalysisError::TranscodeFailed {
                exit_code: status.code().unwrap_or(-1),
                diagnostics: diagnostics.trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Convert raw bytes to f64 samples (little-endian).
fn bytes_to_f64_samples(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(chunk);
            f64::from_le_bytes(arr)
        })
        .collect()
}
