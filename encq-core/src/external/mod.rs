// ============================================================================
// encq-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with the encoder and media inspection tools
//
// Everything that leaves the process lives here: spawning the encoder,
// running mediainfo and finding ffmpeg. The supervisor depends on the traits
// (ProcessSpawner, MediaInspector) rather than the concrete types, so tests
// can substitute scripted implementations.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{CoreError, CoreResult, command_start_error};

pub mod ffmpeg;
pub mod mediainfo;
pub mod process;

pub use ffmpeg::locate_ffmpeg;
pub use mediainfo::{
    MediaInfoInspector, MediaInspector, MediaTrack, SourceInfo, parse_mediainfo_json,
    probe_source, video_track,
};
pub use process::{EncoderProcess, ProcessSpawner, SystemProcess, SystemSpawner};

/// Checks that `program` exists and starts by running it with `-version`.
pub(crate) fn check_dependency(program: &Path) -> CoreResult<()> {
    let result = Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {}", program.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", program.display());
            Err(CoreError::DependencyNotFound(program.display().to_string()))
        }
        Err(e) => {
            log::error!(
                "Failed to start dependency check command '{}': {}",
                program.display(),
                e
            );
            Err(command_start_error(program.display().to_string(), e))
        }
    }
}
