//! Detection pipeline: classification, transcoding, detection, cleanup,
//! and the orchestrator composing them.

mod classify;
mod cleanup;
mod detect;
mod errors;
mod orchestrator;
mod transcode;

pub use classify::{classify, Classification, CANONICAL_EXTENSION};
pub use cleanup::{temp_output_path, TempRegistry};
pub use detect::{detect_all, DetectOptions};
pub use errors::{DetectorError, DetectorResult};
pub use orchestrator::{Detector, RunState};
pub use transcode::{convert_all, TranscodeOptions};
