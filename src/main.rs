//! Command-line surface for clipfind.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use clipfind::config::{ConfigManager, Settings};
use clipfind::detector::Detector;
use clipfind::discovery::{discover_files, DiscoveryOptions, DEFAULT_EXTENSIONS};
use clipfind::logging::{init_tracing, LogLevel};
use clipfind::output::{render, OutputFormat};

/// Find the time offset of a reference audio clip inside the audio/video
/// files of a directory.
#[derive(Parser, Debug)]
#[command(name = "clipfind", version, about)]
struct Cli {
    /// The audio file to search for.
    reference: PathBuf,

    /// The directory with the video or audio files to search in.
    directory: PathBuf,

    /// Search recursively in the specified directory.
    #[arg(short, long)]
    recursive: bool,

    /// Comma-separated list of extensions to search in.
    #[arg(short, long, value_delimiter = ',')]
    extension: Vec<String>,

    /// Comma-separated list of extensions to exclude.
    #[arg(short = 'x', long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Seconds of the reference clip to use. Non-positive means the whole clip.
    #[arg(short = 't', long = "time", allow_negative_numbers = true)]
    time: Option<f64>,

    /// Window in seconds to search within each candidate.
    #[arg(short, long, allow_negative_numbers = true)]
    window: Option<f64>,

    /// Output format.
    #[arg(short, long, default_value = "txt")]
    format: OutputFormat,

    /// Concurrency bound for both conversion and detection.
    #[arg(short = 'c', long)]
    threads: Option<usize>,

    /// Path to the ffmpeg executable.
    #[arg(long)]
    ffmpeg: Option<String>,

    /// Optional config file (defaults are used when absent).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not clean up temporary files.
    #[arg(long)]
    no_clean: bool,

    /// Only print the final output.
    #[arg(long)]
    silent: bool,

    /// Print debug information.
    #[arg(long)]
    debug: bool,

    /// Discover files and print parameters without running detection.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    apply_overrides(&mut settings, &cli);

    let level = if cli.silent {
        LogLevel::Error
    } else if cli.debug {
        LogLevel::Debug
    } else {
        settings.logging.level
    };
    init_tracing(level);

    tracing::debug!("clipfind {}", clipfind::version());
    tracing::debug!("Reference: '{}'", cli.reference.display());
    tracing::debug!("Directory: '{}'", cli.directory.display());

    let discovery = DiscoveryOptions {
        recursive: cli.recursive,
        extensions: if cli.extension.is_empty() {
            DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
        } else {
            cli.extension.clone()
        },
        exclude: cli.exclude.clone(),
    };

    let files = match discover_files(&cli.directory, &discovery) {
        Ok(files) => files,
        Err(e) => {
            tracing::error!("Cannot read '{}': {}", cli.directory.display(), e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Found {} files to search in", files.len());

    if cli.dry_run {
        tracing::info!("Dry run, exiting");
        return ExitCode::SUCCESS;
    }

    let mut detector = Detector::new(&cli.reference, files, &settings);
    match detector.run() {
        Ok(output) => {
            println!("{}", render(&output, cli.format));
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(config: Option<&std::path::Path>) -> Result<Settings, String> {
    match config {
        Some(path) => {
            let mut manager = ConfigManager::new(path);
            manager
                .load()
                .map_err(|e| format!("Cannot load config: {}", e))?;
            Ok(manager.settings().clone())
        }
        None => Ok(Settings::default()),
    }
}

/// Apply CLI flags over loaded settings. Only flags the user actually gave
/// win; everything else keeps its config (or default) value.
fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(window) = cli.window {
        settings.detection.window_secs = window;
    }
    if let Some(time) = cli.time {
        settings.detection.reference_max_secs = time;
    }
    if cli.no_clean {
        settings.detection.clean = false;
    }
    if let Some(ffmpeg) = &cli.ffmpeg {
        settings.detection.ffmpeg = ffmpeg.clone();
    }
    if let Some(threads) = cli.threads {
        settings.concurrency.transcode_slots = threads.max(1);
        settings.concurrency.detect_workers = threads.max(1);
    }
}
