// ============================================================================
// encq-core/src/notifications/abstraction.rs
// ============================================================================
//
// NOTIFICATION ABSTRACTION: What gets announced and how it is sent
//
// NotificationType describes the three outcomes worth a push message.
// NotificationHandler watches the event bus and turns job outcomes into
// notifications for whichever NotificationSender it was given.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::CoreResult;
use crate::events::{EventHandler, QueueEvent};
use crate::job::{JobId, JobStatus};
use crate::utils::format_elapsed;

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationType {
    JobFinished {
        title: String,
        duration: Duration,
        size_report: Option<String>,
    },
    JobCancelled {
        title: String,
    },
    /// The encoder could not be started.
    JobFailed {
        title: String,
        message: String,
    },
}

impl NotificationType {
    pub fn get_title(&self) -> String {
        match self {
            NotificationType::JobFinished { .. } => "Encode Finished".to_string(),
            NotificationType::JobCancelled { .. } => "Encode Stopped".to_string(),
            NotificationType::JobFailed { .. } => "Encode Failed".to_string(),
        }
    }

    pub fn get_message(&self) -> String {
        match self {
            NotificationType::JobFinished {
                title,
                duration,
                size_report,
            } => {
                let mut message = format!(
                    "Finished encoding {title} in {}",
                    format_elapsed(duration.as_secs_f64())
                );
                if let Some(report) = size_report {
                    message.push_str(". ");
                    message.push_str(report);
                }
                message
            }
            NotificationType::JobCancelled { title } => format!("Stopped encoding {title}"),
            NotificationType::JobFailed { title, message } => {
                format!("Could not encode {title}: {message}")
            }
        }
    }

    /// Priority level (1-5, with 5 being highest)
    pub fn get_priority(&self) -> u8 {
        match self {
            NotificationType::JobFinished { .. } => 4,
            NotificationType::JobCancelled { .. } => 3,
            NotificationType::JobFailed { .. } => 5,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            NotificationType::JobFinished { .. } => "complete",
            NotificationType::JobCancelled { .. } => "stopped",
            NotificationType::JobFailed { .. } => "error",
        }
    }
}

/// Delivers notifications to some backend.
pub trait NotificationSender: Send + Sync {
    fn send_notification(&self, notification: &NotificationType) -> CoreResult<()>;
}

/// Event handler that sends a notification whenever a job ends.
///
/// Delivery failures are logged and otherwise ignored.
pub struct NotificationHandler<S> {
    sender: S,
    failures: Mutex<HashMap<JobId, String>>,
}

impl<S: NotificationSender> NotificationHandler<S> {
    pub fn new(sender: S) -> Self {
        Self {
            sender,
            failures: Mutex::new(HashMap::new()),
        }
    }

    fn notification_for(&self, event: &QueueEvent) -> Option<NotificationType> {
        match event {
            QueueEvent::JobFailed { id, error } => {
                self.failures.lock().insert(*id, error.clone());
                None
            }
            QueueEvent::JobFinished {
                id,
                status,
                summary,
            } => {
                let title = summary.title.clone();
                if let Some(message) = self.failures.lock().remove(id) {
                    return Some(NotificationType::JobFailed { title, message });
                }
                Some(match status {
                    JobStatus::Cancelled => NotificationType::JobCancelled { title },
                    _ => NotificationType::JobFinished {
                        title,
                        duration: summary.duration,
                        size_report: summary.size_report.map(|report| report.to_string()),
                    },
                })
            }
            _ => None,
        }
    }
}

impl<S: NotificationSender> EventHandler for NotificationHandler<S> {
    fn handle(&self, event: &QueueEvent) {
        if let Some(notification) = self.notification_for(event) {
            if let Err(e) = self.sender.send_notification(&notification) {
                log::warn!("Failed to send notification: {e}");
            }
        }
    }
}
