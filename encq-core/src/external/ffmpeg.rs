//! Locating the ffmpeg executable.

use std::path::{Path, PathBuf};

use ffmpeg_sidecar::command::ffmpeg_is_installed;
use ffmpeg_sidecar::paths::ffmpeg_path;

use crate::error::{CoreError, CoreResult};
use crate::external::check_dependency;

/// Returns the ffmpeg executable to put at the front of encode commands.
///
/// An explicit path must answer `-version`. Without one, the sidecar location
/// next to the current executable is preferred, falling back to `ffmpeg` on
/// the PATH.
pub fn locate_ffmpeg(explicit: Option<&Path>) -> CoreResult<PathBuf> {
    if let Some(path) = explicit {
        check_dependency(path)?;
        return Ok(path.to_path_buf());
    }

    if ffmpeg_is_installed() {
        let path = ffmpeg_path();
        log::debug!("Using ffmpeg at {}", path.display());
        Ok(path)
    } else {
        log::warn!("ffmpeg not found next to the executable or on the PATH");
        Err(CoreError::DependencyNotFound("ffmpeg".to_string()))
    }
}
