//! Encoder output parsing and progress samples.
//!
//! The encoder writes a stats line (`frame=  120 fps= 45 q=28.0 size=  10240kB
//! time=00:00:05.00 ...`) over and over while it works. [`ProgressParser`]
//! turns one such line into a [`ProgressLine`]; [`ProgressSample::derive`]
//! adds the values that need the job's frame total and the elapsed wall time.
//! Neither keeps state between calls, the caller threads it through.
//!
//! A field that cannot be parsed becomes `None` on its own, the rest of the
//! line is still used.

pub mod cell;

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::config::DEFAULT_PROGRESS_PREFIX;
use crate::utils::{format_elapsed, format_eta, parse_ffmpeg_time};

pub use cell::{ProgressCell, ProgressSnapshot};

/// Raw counters read from one progress line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressLine {
    pub frame: Option<u64>,
    pub fps: Option<f64>,
    pub quality: Option<f64>,
    /// Output size so far, in kB as the encoder reports it.
    pub size_kb: Option<u64>,
    /// Encoded media position, in seconds.
    pub time_secs: Option<f64>,
    pub speed: Option<f64>,
}

/// Recognises progress lines and extracts their fields.
#[derive(Debug, Clone)]
pub struct ProgressParser {
    prefix: String,
}

impl Default for ProgressParser {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_PREFIX)
    }
}

impl ProgressParser {
    /// Creates a parser for lines starting with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether `line` is a progress line at all.
    pub fn is_progress_line(&self, line: &str) -> bool {
        !self.prefix.is_empty() && line.starts_with(&self.prefix)
    }

    /// Parses `line`, returning `None` when it is not a progress line.
    pub fn parse(&self, line: &str) -> Option<ProgressLine> {
        if !self.is_progress_line(line) {
            return None;
        }

        Some(ProgressLine {
            frame: field_value(line, "frame=").and_then(|v| v.parse().ok()),
            fps: field_value(line, "fps=").and_then(|v| v.parse().ok()),
            quality: field_value(line, "q=").and_then(|v| v.parse().ok()),
            size_kb: field_value(line, "size=").and_then(parse_size_kb),
            time_secs: field_value(line, "time=").and_then(parse_ffmpeg_time),
            speed: field_value(line, "speed=")
                .and_then(|v| v.trim_end_matches('x').parse().ok()),
        })
    }
}

/// Finds `label` in `line` and returns the token that follows it.
///
/// Labels only count at a token boundary, so `time=` does not match inside
/// `out_time=`. The final summary line spells the size as `Lsize=`, hence `L`
/// is accepted as a boundary too.
fn field_value<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let mut search_from = 0;
    while let Some(offset) = line[search_from..].find(label) {
        let start = search_from + offset;
        let at_boundary = line[..start]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace() || c == 'L');

        if at_boundary {
            let rest = line[start + label.len()..].trim_start();
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let value = &rest[..end];
            return (!value.is_empty()).then_some(value);
        }
        search_from = start + label.len();
    }
    None
}

fn parse_size_kb(value: &str) -> Option<u64> {
    let digits = value
        .strip_suffix("KiB")
        .or_else(|| value.strip_suffix("kiB"))
        .or_else(|| value.strip_suffix("kB"))
        .unwrap_or(value);
    digits.trim().parse().ok()
}

/// A progress line plus everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSample {
    pub frames_done: Option<u64>,
    pub total_frames: Option<u64>,
    pub fps: Option<f64>,
    pub quality: Option<f64>,
    pub size_kb: Option<u64>,
    pub time_secs: Option<f64>,
    pub speed: Option<f64>,
    pub percent_done: Option<f64>,
    pub estimated_final_size_mib: Option<f64>,
    pub elapsed: Duration,
    pub eta: Option<Duration>,
}

impl ProgressSample {
    /// Combines a parsed line with the job's frame total and the time spent
    /// since the encoder was started.
    ///
    /// Percent, size estimate and ETA stay `None` when the total is unknown.
    pub fn derive(line: ProgressLine, total_frames: Option<u64>, elapsed: Duration) -> Self {
        let total = total_frames.filter(|&t| t > 0);

        let percent_done = match (total, line.frame) {
            (Some(total), Some(done)) => {
                let total = total as f64;
                Some(100.0 - ((total - done as f64) / total * 100.0))
            }
            _ => None,
        };

        let estimated_final_size_mib = match (percent_done, line.size_kb) {
            (Some(percent), Some(size_kb)) if percent > 0.0 => {
                Some((size_kb as f64 / 1024.0 * 100.0) / percent)
            }
            _ => None,
        };

        let eta = match (total, line.frame) {
            (Some(total), Some(done)) => {
                let remaining = total.saturating_sub(done) as f64;
                let per_frame = elapsed.as_secs_f64() / done.max(1) as f64;
                Some(Duration::from_secs_f64(remaining * per_frame))
            }
            _ => None,
        };

        Self {
            frames_done: line.frame,
            total_frames: total,
            fps: line.fps,
            quality: line.quality,
            size_kb: line.size_kb,
            time_secs: line.time_secs,
            speed: line.speed,
            percent_done,
            estimated_final_size_mib,
            elapsed,
            eta,
        }
    }
}

impl fmt::Display for ProgressSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frames = self.frames_done.map_or("?".to_string(), |v| v.to_string());
        let total = self.total_frames.map_or("?".to_string(), |v| v.to_string());
        let fps = self.fps.map_or("?".to_string(), |v| format!("{v}"));
        let done = self
            .percent_done
            .map_or("?".to_string(), |v| format!("{v:.1}%"));
        let size = self
            .estimated_final_size_mib
            .map_or("?".to_string(), |v| format!("{v:.2}"));
        let eta = self.eta.map_or(String::new(), |v| format_eta(v.as_secs_f64()));

        write!(
            f,
            "frame: {frames}/{total} | fps: {fps} | done: {done} | est. size: {size} | elapsed: {} | time: {eta}",
            format_elapsed(self.elapsed.as_secs_f64())
        )
    }
}
