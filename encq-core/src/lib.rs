//! Core library for the encq encode queue.
//!
//! Jobs describe one encoder invocation each. They go into a [`JobQueue`],
//! and a single [`Supervisor`] thread runs them in order. It streams the
//! encoder's output through a [`ProgressParser`] and reports lifecycle events
//! and the latest progress sample through an [`EventBus`].
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use encq_core::{Job, QueueConfig, QueueEvent, Supervisor, SystemSpawner};
//!
//! let config = QueueConfig::from_env();
//! let (supervisor, handle) = Supervisor::from_config(&config, SystemSpawner);
//! let events = handle.events().subscribe();
//! let worker = supervisor.spawn().unwrap();
//!
//! let job = Job::new(
//!     "movie.mkv",
//!     vec!["ffmpeg".into(), "-i".into(), "movie.mkv".into(), "movie_new.mkv".into()],
//!     "movie_new.mkv",
//! );
//! handle.queue().enqueue(job).unwrap();
//!
//! for event in events.iter() {
//!     if let QueueEvent::JobFinished { summary, .. } = event {
//!         println!("{summary}");
//!         break;
//!     }
//! }
//! handle.shutdown();
//! worker.join().unwrap();
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod external;
pub mod job;
pub mod notifications;
pub mod progress;
pub mod queue;
pub mod supervisor;
pub mod utils;

// Re-exports for public API
pub use config::{QueueConfig, QueueConfigBuilder};
pub use error::{CoreError, CoreResult};
pub use events::{EventBus, EventHandler, JobSummary, QueueEvent, SizeReport};
pub use external::{
    EncoderProcess, MediaInfoInspector, MediaInspector, MediaTrack, ProcessSpawner, SourceInfo,
    SystemSpawner, locate_ffmpeg, probe_source,
};
pub use job::{Job, JobId, JobStatus};
pub use notifications::{NotificationHandler, NtfyNotificationSender};
pub use progress::{ProgressCell, ProgressLine, ProgressParser, ProgressSample, ProgressSnapshot};
pub use queue::JobQueue;
pub use supervisor::{Control, Supervisor, SupervisorHandle};
pub use utils::{format_elapsed, format_eta, parse_ffmpeg_time};
