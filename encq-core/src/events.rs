// ============================================================================
// encq-core/src/events.rs
// ============================================================================
//
// EVENTS: Lifecycle events and the bus that carries them to observers
//
// Two kinds of traffic leave the supervisor:
// - lifecycle events (started, preamble, size report, finished, ...), which
//   every subscriber receives in order, one channel per subscriber;
// - progress samples, which only ever go into the shared ProgressCell where
//   the newest one replaces the last.
//
// In-process handlers (notifications, for instance) can also be attached and
// are called synchronously from the supervisor thread.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use serde::Serialize;

use crate::job::{JobId, JobStatus};
use crate::progress::{ProgressCell, ProgressSnapshot};
use crate::utils::format_elapsed;

/// Output size compared against the source video stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeReport {
    pub final_mib: f64,
    pub saved_mib: f64,
    pub reduction_percent: f64,
}

impl SizeReport {
    /// Builds the report from the source and output video stream sizes.
    /// Returns `None` when the source size is zero.
    pub fn from_sizes(source_mib: f64, final_mib: f64) -> Option<Self> {
        if source_mib <= 0.0 {
            return None;
        }
        Some(Self {
            final_mib,
            saved_mib: source_mib - final_mib,
            reduction_percent: 100.0 - final_mib / source_mib * 100.0,
        })
    }
}

impl fmt::Display for SizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Final size: {:.2} MB, saving {:.2} MB. A size reduction of {:.2}%",
            self.final_mib, self.saved_mib, self.reduction_percent
        )
    }
}

/// Human-readable wrap-up of one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub title: String,
    pub status: JobStatus,
    pub duration: Duration,
    pub frames_done: Option<u64>,
    pub size_report: Option<SizeReport>,
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.status {
            JobStatus::Cancelled => "Stopped encode of",
            _ => "Finished encode of",
        };
        let frames = self
            .frames_done
            .map_or_else(|| "unknown".to_string(), |frames| frames.to_string());
        write!(
            f,
            "** {verb} {}.\nDuration: {}\n{frames} frames **",
            self.title,
            format_elapsed(self.duration.as_secs_f64())
        )?;
        if let Some(report) = &self.size_report {
            write!(f, "\n{report}")?;
        }
        Ok(())
    }
}

/// Everything the supervisor announces about a job, in emission order:
/// `JobStarted`, then optionally `Preamble`, `StopRequested`, `JobFailed` and
/// `SizeReport`, then always `JobFinished`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueueEvent {
    JobStarted {
        id: JobId,
        title: String,
    },
    /// Encoder output that came before the first progress line.
    Preamble {
        id: JobId,
        text: String,
    },
    /// The encoder was killed on request.
    StopRequested {
        id: JobId,
    },
    /// The encoder could not be launched.
    JobFailed {
        id: JobId,
        error: String,
    },
    SizeReport {
        id: JobId,
        report: SizeReport,
    },
    JobFinished {
        id: JobId,
        status: JobStatus,
        summary: JobSummary,
    },
}

impl QueueEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            QueueEvent::JobStarted { id, .. }
            | QueueEvent::Preamble { id, .. }
            | QueueEvent::StopRequested { id }
            | QueueEvent::JobFailed { id, .. }
            | QueueEvent::SizeReport { id, .. }
            | QueueEvent::JobFinished { id, .. } => *id,
        }
    }
}

/// Synchronous consumer of lifecycle events.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &QueueEvent);
}

/// Fan-out point for lifecycle events plus the latest-progress slot.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<QueueEvent>>>,
    handlers: Mutex<Vec<Arc<dyn EventHandler>>>,
    progress: Arc<ProgressCell>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a receiver that gets every event emitted from now on.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<QueueEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn add_handler(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.lock().push(handler);
    }

    /// The latest-wins progress slot.
    pub fn progress(&self) -> Arc<ProgressCell> {
        Arc::clone(&self.progress)
    }

    pub fn emit(&self, event: QueueEvent) {
        let handlers = self.handlers.lock().clone();
        for handler in &handlers {
            handler.handle(&event);
        }
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn publish_progress(&self, snapshot: ProgressSnapshot) {
        self.progress.publish(snapshot);
    }

    pub fn clear_progress(&self) {
        self.progress.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl EventHandler for Counter {
        fn handle(&self, _event: &QueueEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_every_subscriber_gets_every_event() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();
        let id = JobId::new();

        bus.emit(QueueEvent::JobStarted {
            id,
            title: "a.mkv".to_string(),
        });
        bus.emit(QueueEvent::StopRequested { id });

        for rx in [&first, &second] {
            assert!(matches!(rx.try_recv(), Ok(QueueEvent::JobStarted { .. })));
            assert!(matches!(rx.try_recv(), Ok(QueueEvent::StopRequested { .. })));
        }
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.emit(QueueEvent::StopRequested { id: JobId::new() });
        assert_eq!(bus.subscribers.lock().len(), 1);
        assert!(kept.try_recv().is_ok());
    }

    #[test]
    fn test_handlers_are_called() {
        let bus = EventBus::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        bus.add_handler(counter.clone());

        bus.emit(QueueEvent::StopRequested { id: JobId::new() });
        bus.emit(QueueEvent::StopRequested { id: JobId::new() });
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_size_report() {
        let report = SizeReport::from_sizes(200.0, 50.0).unwrap();
        assert_eq!(report.saved_mib, 150.0);
        assert_eq!(report.reduction_percent, 75.0);
        assert_eq!(
            report.to_string(),
            "Final size: 50.00 MB, saving 150.00 MB. A size reduction of 75.00%"
        );
        assert!(SizeReport::from_sizes(0.0, 10.0).is_none());
    }

    #[test]
    fn test_summary_display() {
        let summary = JobSummary {
            title: "movie.mkv".to_string(),
            status: JobStatus::Finished,
            duration: Duration::from_secs(3725),
            frames_done: Some(1000),
            size_report: None,
        };
        assert_eq!(
            summary.to_string(),
            "** Finished encode of movie.mkv.\nDuration: 1h:2m:5.00s\n1000 frames **"
        );

        let stopped = JobSummary {
            status: JobStatus::Cancelled,
            frames_done: None,
            ..summary
        };
        assert!(stopped.to_string().starts_with("** Stopped encode of movie.mkv."));
        assert!(stopped.to_string().contains("unknown frames"));
    }
}
