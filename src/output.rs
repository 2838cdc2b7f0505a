//! Rendering of run results for the CLI surface.

use std::str::FromStr;

use crate::models::RunOutput;

/// Output format for rendered results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
    /// Compact JSON on one line.
    Raw,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "raw" => Ok(OutputFormat::Raw),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// Render a run's results in the requested format.
pub fn render(output: &RunOutput, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render_text(output),
        OutputFormat::Json => {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Raw => serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string()),
    }
}

fn render_text(output: &RunOutput) -> String {
    let mut lines = Vec::new();

    for (file, offset) in &output.offsets {
        lines.push(format!("{}: clip found at {:.2}s", file.display(), offset));
    }
    for (file, reason) in &output.failures {
        lines.push(format!("{}: detection failed ({})", file.display(), reason));
    }

    if lines.is_empty() {
        lines.push("No results.".to_string());
    }

    lines.join("\n")
}
