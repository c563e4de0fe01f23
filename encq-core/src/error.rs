// ============================================================================
// encq-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error types for the encq core library
//
// Queue operations called by an observer return these errors synchronously.
// Per-job failures inside the supervisor are logged and turned into events
// instead of being propagated out of the worker loop.

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

use crate::job::JobId;

/// Custom error types for encq
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A queue operation would break the running-job or uniqueness invariants.
    #[error("Invalid state for job {id}: {reason}")]
    InvalidState { id: JobId, reason: String },

    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// The encoder process could not be launched.
    #[error("Failed to start '{command}': {source}")]
    ProcessSpawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command '{command}' failed with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Media inspection unavailable: {0}")]
    InspectionUnavailable(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Empty command for job {0}")]
    EmptyCommand(JobId),
}

/// Result type for encq operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Builds the error returned when a command cannot be started.
pub fn command_start_error(command: impl Into<String>, source: io::Error) -> CoreError {
    CoreError::ProcessSpawn {
        command: command.into(),
        source,
    }
}

/// Builds the error returned when a command ran but reported failure.
pub fn command_failed_error(
    command: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed {
        command: command.into(),
        status,
        stderr: stderr.into(),
    }
}

pub(crate) fn invalid_state(id: JobId, reason: impl Into<String>) -> CoreError {
    CoreError::InvalidState {
        id,
        reason: reason.into(),
    }
}
