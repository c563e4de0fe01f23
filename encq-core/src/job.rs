// ============================================================================
// encq-core/src/job.rs
// ============================================================================
//
// JOB MODEL: One queued transcode request and its runtime status
//
// A Job is created by whoever builds encoder commands (the CLI here) and is
// then owned by the JobQueue. Everything except the status is fixed at
// construction; the status only moves forward through the lifecycle
// Waiting -> Running -> Finished | Cancelled.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreResult, invalid_state};

/// Opaque unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Waiting,
    Running,
    Finished,
    Cancelled,
}

impl JobStatus {
    /// Finished and Cancelled never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Cancelled)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Waiting, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Finished)
                | (JobStatus::Running, JobStatus::Cancelled)
        )
    }

    /// Short label used in queue listings.
    pub fn label(self) -> &'static str {
        match self {
            JobStatus::Waiting => "⏱ waiting",
            JobStatus::Running => "▶ started",
            JobStatus::Finished => "✓ finished",
            JobStatus::Cancelled => "✗ cancelled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single transcode request.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    id: JobId,
    title: String,
    command: Vec<String>,
    output_path: PathBuf,
    total_frames: Option<u64>,
    source_video_bytes: Option<u64>,
    status: JobStatus,
}

impl Job {
    /// Creates a waiting job that will run `command` (program first) and
    /// write to `output_path`.
    pub fn new(
        title: impl Into<String>,
        command: Vec<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: JobId::new(),
            title: title.into(),
            command,
            output_path: output_path.into(),
            total_frames: None,
            source_video_bytes: None,
            status: JobStatus::Waiting,
        }
    }

    /// Sets the frame count used as the progress denominator: the source
    /// frame count, or the frame limit of a test encode.
    pub fn with_total_frames(mut self, total_frames: Option<u64>) -> Self {
        self.total_frames = total_frames.filter(|&frames| frames > 0);
        self
    }

    /// Sets the size of the source video stream, used for the size-reduction
    /// report once the encode is done.
    pub fn with_source_video_bytes(mut self, bytes: Option<u64>) -> Self {
        self.source_video_bytes = bytes;
        self
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn total_frames(&self) -> Option<u64> {
        self.total_frames
    }

    pub fn source_video_bytes(&self) -> Option<u64> {
        self.source_video_bytes
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Moves the job to `next`, rejecting transitions the lifecycle forbids.
    pub(crate) fn transition(&mut self, next: JobStatus) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(invalid_state(
                self.id,
                format!("cannot move from {:?} to {:?}", self.status, next),
            ));
        }
        self.status = next;
        Ok(())
    }

    /// The command rendered as a single string, for logs.
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {} - {}", self.status, self.title, self.id)
    }
}
