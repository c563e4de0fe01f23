//! Formatting helpers shared by the progress line, job summaries and the CLI.

use std::path::Path;

const MIB: f64 = 1024.0 * 1024.0;

/// Formats elapsed seconds the way the progress line shows them
/// (e.g., 3725.5 -> "1h:2m:5.50s").
#[must_use]
pub fn format_elapsed(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let hours = (seconds / 3600.0).floor();
    let minutes = ((seconds % 3600.0) / 60.0).floor();
    format!("{}h:{}m:{:.2}s", hours as u64, minutes as u64, seconds % 60.0)
}

/// Formats a remaining-time estimate in the coarsest sensible unit:
/// whole seconds under a minute, rounded minutes under an hour, otherwise
/// hours with two decimals.
#[must_use]
pub fn format_eta(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    if seconds < 60.0 {
        format!("{} seconds", seconds as u64)
    } else if seconds < 3600.0 {
        format!("{} minutes", (seconds / 60.0).round() as u64)
    } else {
        format!("{:.2} hours", seconds / 3600.0)
    }
}

/// Parses an encoder timestamp (HH:MM:SS.ms) into seconds.
///
/// Negative timestamps, which the encoder prints before the first packet, are
/// treated as unknown.
#[must_use]
pub fn parse_ffmpeg_time(time: &str) -> Option<f64> {
    let mut parts = time.split(':');
    let (hours, minutes, seconds) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let hours = hours.parse::<f64>().ok()?;
    let minutes = minutes.parse::<f64>().ok()?;
    let seconds = seconds.parse::<f64>().ok()?;
    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    (total >= 0.0 && hours >= 0.0).then_some(total)
}

/// Converts a byte count to MiB.
#[must_use]
pub fn bytes_to_mib(bytes: u64) -> f64 {
    bytes as f64 / MIB
}

/// The file name component of `path` for display, falling back to the whole
/// path when there is none.
#[must_use]
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
