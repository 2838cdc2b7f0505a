//! Candidate classification.
//!
//! Pure partition of candidate paths into "already canonical" and "needs
//! transcoding". Name check only, no I/O.

use std::path::{Path, PathBuf};

/// The canonical audio container all correlation input is normalized to.
pub const CANONICAL_EXTENSION: &str = "wav";

/// Partition of candidate paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Files already in the canonical audio format, in input order.
    pub ready: Vec<PathBuf>,
    /// Files that must be transcoded first, in input order.
    pub needs_conversion: Vec<PathBuf>,
}

/// Whether a path carries the canonical audio extension.
fn is_canonical(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(CANONICAL_EXTENSION))
        .unwrap_or(false)
}

/// Partition candidate paths by canonical extension.
///
/// Deterministic: the same input always yields the same partition, and
/// input order is preserved within each side.
pub fn classify(paths: &[PathBuf]) -> Classification {
    let mut classification = Classification::default();

    for path in paths {
        if is_canonical(path) {
            classification.ready.push(path.clone());
        } else {
            classification.needs_conversion.push(path.clone());
        }
    }

    classification
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn wav_files_are_ready() {
        let result = classify(&paths(&["/a/song.wav", "/b/clip.WAV"]));
        assert_eq!(result.ready.len(), 2);
        assert!(result.needs_conversion.is_empty());
    }

    #[test]
    fn other_extensions_need_conversion() {
        let result = classify(&paths(&["/a/video.mp4", "/b/track.flac", "/c/noext"]));
        assert!(result.ready.is_empty());
        assert_eq!(result.needs_conversion.len(), 3);
    }

    #[test]
    fn mixed_inputs_partition_in_order() {
        let result = classify(&paths(&["/x.mp4", "/y.wav", "/z.mkv", "/w.wav"]));
        assert_eq!(result.ready, paths(&["/y.wav", "/w.wav"]));
        assert_eq!(result.needs_conversion, paths(&["/x.mp4", "/z.mkv"]));
    }

    #[test]
    fn classification_is_deterministic() {
        let input = paths(&["/a.mp4", "/b.wav", "/c.ogg", "/d.wav", "/e.avi"]);
        let first = classify(&input);
        let second = classify(&input);
        assert_eq!(first, second);
    }
}
