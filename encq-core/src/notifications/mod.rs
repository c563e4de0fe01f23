//! Push notifications about finished, stopped and failed jobs.
//!
//! Attach a [`NotificationHandler`] to the event bus; it sends through any
//! [`NotificationSender`], normally [`NtfyNotificationSender`].
mod abstraction;
mod ntfy;

pub use abstraction::{NotificationHandler, NotificationSender, NotificationType};
pub use ntfy::NtfyNotificationSender;
