//! Media inspection through the `mediainfo` command-line tool.
//!
//! The supervisor only needs the [`MediaInspector`] trait: it asks for the
//! tracks of a finished output file to build the size report. Callers building
//! jobs use [`probe_source`] to find the frame count and video stream size of
//! an input before queueing it.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use crate::utils::display_name;

/// One track as reported by the inspector. Every field is optional because
/// containers and tools omit them freely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaTrack {
    /// "General", "Video", "Audio", "Text", ...
    pub track_type: String,
    pub stream_size_bytes: Option<u64>,
    pub frame_count: Option<u64>,
    pub frame_rate: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_ms: Option<u64>,
}

impl MediaTrack {
    pub fn is_video(&self) -> bool {
        self.track_type == "Video"
    }
}

/// Reads the track list of a media file.
pub trait MediaInspector: Send + Sync {
    fn inspect(&self, path: &Path) -> CoreResult<Vec<MediaTrack>>;
}

/// First video track in `tracks`.
pub fn video_track(tracks: &[MediaTrack]) -> Option<&MediaTrack> {
    tracks.iter().find(|track| track.is_video())
}

// ---- mediainfo JSON layout ----
//
// mediainfo reports every value as a string, including numbers.

#[derive(Debug, Deserialize)]
struct MediaInfoResponse {
    media: Option<MediaInfoMedia>,
}

#[derive(Debug, Deserialize)]
struct MediaInfoMedia {
    #[serde(default)]
    track: Vec<MediaInfoTrack>,
}

#[derive(Debug, Deserialize)]
struct MediaInfoTrack {
    #[serde(rename = "@type")]
    track_type: String,
    #[serde(rename = "StreamSize")]
    stream_size: Option<String>,
    #[serde(rename = "FrameCount")]
    frame_count: Option<String>,
    #[serde(rename = "FrameRate")]
    frame_rate: Option<String>,
    #[serde(rename = "Width")]
    width: Option<String>,
    #[serde(rename = "Height")]
    height: Option<String>,
    /// Seconds, with a fractional part.
    #[serde(rename = "Duration")]
    duration: Option<String>,
}

impl From<MediaInfoTrack> for MediaTrack {
    fn from(track: MediaInfoTrack) -> Self {
        fn number<T: std::str::FromStr>(value: &Option<String>) -> Option<T> {
            value.as_deref().and_then(|v| v.trim().parse().ok())
        }

        let duration_ms = number::<f64>(&track.duration)
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| (secs * 1000.0).round() as u64);

        Self {
            stream_size_bytes: number(&track.stream_size),
            frame_count: number(&track.frame_count),
            frame_rate: number(&track.frame_rate),
            width: number(&track.width),
            height: number(&track.height),
            duration_ms,
            track_type: track.track_type,
        }
    }
}

/// Parses `mediainfo --Output=JSON` output into tracks.
pub fn parse_mediainfo_json(json: &str) -> CoreResult<Vec<MediaTrack>> {
    let response: MediaInfoResponse = serde_json::from_str(json)
        .map_err(|e| CoreError::JsonParse(format!("Failed to parse mediainfo output: {e}")))?;
    Ok(response
        .media
        .map(|media| media.track.into_iter().map(MediaTrack::from).collect())
        .unwrap_or_default())
}

/// Runs the `mediainfo` executable.
#[derive(Debug, Clone)]
pub struct MediaInfoInspector {
    program: PathBuf,
}

impl Default for MediaInfoInspector {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MEDIAINFO_PATH)
    }
}

impl MediaInfoInspector {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MediaInspector for MediaInfoInspector {
    fn inspect(&self, path: &Path) -> CoreResult<Vec<MediaTrack>> {
        log::debug!("Running mediainfo on: {}", path.display());
        let program = self.program.display().to_string();

        let output = Command::new(&self.program)
            .arg("--Output=JSON")
            .arg(path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CoreError::InspectionUnavailable(format!("{program} not found"))
                } else {
                    command_start_error(&program, e)
                }
            })?;

        if !output.status.success() {
            return Err(command_failed_error(
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        parse_mediainfo_json(&String::from_utf8_lossy(&output.stdout))
    }
}

/// What the queue needs to know about an input before encoding it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceInfo {
    pub path: PathBuf,
    pub display_name: String,
    pub has_video: bool,
    pub frame_count: Option<u64>,
    pub video_stream_bytes: Option<u64>,
    pub frame_rate: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_ms: Option<u64>,
}

/// Inspects `path` and summarises its first video track.
pub fn probe_source(inspector: &dyn MediaInspector, path: &Path) -> CoreResult<SourceInfo> {
    let tracks = inspector.inspect(path)?;
    let video = video_track(&tracks);
    let general = tracks.iter().find(|track| track.track_type == "General");

    Ok(SourceInfo {
        path: path.to_path_buf(),
        display_name: display_name(path),
        has_video: video.is_some(),
        frame_count: video.and_then(|v| v.frame_count),
        video_stream_bytes: video.and_then(|v| v.stream_size_bytes),
        frame_rate: video.and_then(|v| v.frame_rate),
        width: video.and_then(|v| v.width),
        height: video.and_then(|v| v.height),
        duration_ms: video
            .and_then(|v| v.duration_ms)
            .or_else(|| general.and_then(|g| g.duration_ms)),
    })
}
