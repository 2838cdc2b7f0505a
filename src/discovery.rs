//! Candidate file discovery.
//!
//! Walks a directory, optionally recursing, and keeps files whose extension
//! matches the include list and misses the exclude list. The result is
//! sorted so runs over the same tree are deterministic.

use std::io;
use std::path::{Path, PathBuf};

/// Extensions searched when the caller gives none.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "mp3", "wav", "flac", "ogg", "m4a", "wma",
];

/// Options for directory discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Extensions to keep (case-insensitive). Empty means keep all.
    pub extensions: Vec<String>,
    /// Extensions to drop (case-insensitive), applied after the include list.
    pub exclude: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
        }
    }
}

/// Discover candidate files under `dir`.
pub fn discover_files(dir: &Path, options: &DiscoveryOptions) -> io::Result<Vec<PathBuf>> {
    let mut output = Vec::new();
    walk(dir, options, &mut output)?;
    output.sort();
    Ok(output)
}

fn walk(dir: &Path, options: &DiscoveryOptions, output: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            if options.recursive {
                walk(&path, options, output)?;
            }
            continue;
        }

        if !matches_extension(&path, &options.extensions) {
            tracing::debug!("Skipping '{}': extension not included", path.display());
            continue;
        }

        if !options.exclude.is_empty() && matches_extension(&path, &options.exclude) {
            tracing::debug!("Skipping '{}': extension excluded", path.display());
            continue;
        }

        tracing::debug!("Found file '{}'", path.display());
        output.push(path);
    }

    Ok(())
}

/// Whether the path's extension appears in `list` (empty list matches all).
fn matches_extension(path: &Path, list: &[String]) -> bool {
    if list.is_empty() {
        return true;
    }

    path.extension()
        .map(|ext| list.iter().any(|e| ext.eq_ignore_ascii_case(e.as_str())))
        .unwrap_or(false)
}
