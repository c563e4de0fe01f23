// ============================================================================
// encq-core/src/notifications/ntfy.rs
// ============================================================================
//
// NTFY IMPLEMENTATION: Push notifications through an ntfy server
//
// The topic is given as one URL (https://ntfy.sh/my-topic). It is split into
// the server base URL and the topic name once, when the sender is created.

use ntfy::DispatcherBuilder;
use ntfy::payload::{Payload, Priority as NtfyPriority};

use crate::error::{CoreError, CoreResult};
use crate::notifications::{NotificationSender, NotificationType};

/// Sends notifications to an ntfy topic using the blocking client.
///
/// ```rust,no_run
/// use encq_core::notifications::{NotificationSender, NotificationType, NtfyNotificationSender};
///
/// let sender = NtfyNotificationSender::new("https://ntfy.sh/your_topic").unwrap();
/// sender
///     .send_notification(&NotificationType::JobCancelled {
///         title: "movie.mkv".to_string(),
///     })
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct NtfyNotificationSender {
    base_url: String,
    topic: String,
}

impl NtfyNotificationSender {
    /// Validates `topic_url` and splits it into server and topic.
    pub fn new(topic_url: &str) -> CoreResult<Self> {
        let after_scheme = topic_url.strip_prefix("https://").ok_or_else(|| {
            CoreError::Notification(format!(
                "Invalid ntfy topic URL '{topic_url}': must start with https://"
            ))
        })?;

        let (host, topic) = after_scheme
            .split_once('/')
            .unwrap_or((after_scheme, ""));

        if host.is_empty() {
            return Err(CoreError::Notification(format!(
                "URL '{topic_url}' must have a non-empty host"
            )));
        }
        let topic = topic.trim_end_matches('/');
        if topic.is_empty() {
            return Err(CoreError::Notification(format!(
                "URL '{topic_url}' is missing topic path"
            )));
        }

        Ok(Self {
            base_url: format!("https://{host}"),
            topic: topic.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl NotificationSender for NtfyNotificationSender {
    fn send_notification(&self, notification: &NotificationType) -> CoreResult<()> {
        let dispatcher = DispatcherBuilder::new(&self.base_url)
            .build_blocking()
            .map_err(|e| {
                CoreError::Notification(format!(
                    "Failed to build ntfy dispatcher for {}: {}",
                    self.base_url, e
                ))
            })?;

        let priority = map_priority(notification.get_priority()).unwrap_or_else(|| {
            log::warn!(
                "Invalid ntfy priority value provided: {}",
                notification.get_priority()
            );
            NtfyPriority::Default
        });

        let payload = Payload::new(&self.topic)
            .message(notification.get_message())
            .title(notification.get_title())
            .priority(priority)
            .tags(vec!["encq".to_string(), notification.tag().to_string()]);

        dispatcher.send(&payload).map_err(|e| {
            CoreError::Notification(format!(
                "Failed to send ntfy notification to {}/{}: {}",
                self.base_url, self.topic, e
            ))
        })?;
        log::debug!("Sent '{}' notification", notification.get_title());
        Ok(())
    }
}

/// Maps a 1-5 priority onto ntfy's levels.
fn map_priority(p: u8) -> Option<NtfyPriority> {
    match p {
        1 => Some(NtfyPriority::Min),
        2 => Some(NtfyPriority::Low),
        3 => Some(NtfyPriority::Default),
        4 => Some(NtfyPriority::High),
        5 => Some(NtfyPriority::Max),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_topic_url() {
        let sender = NtfyNotificationSender::new("https://ntfy.sh/encodes").unwrap();
        assert_eq!(sender.base_url(), "https://ntfy.sh");
        assert_eq!(sender.topic(), "encodes");
    }

    #[test]
    fn test_invalid_topic_urls() {
        for url in [
            "http://ntfy.sh/encodes",
            "ntfy.sh/encodes",
            "https:///encodes",
            "https://ntfy.sh",
            "https://ntfy.sh/",
        ] {
            assert!(
                matches!(
                    NtfyNotificationSender::new(url),
                    Err(CoreError::Notification(_))
                ),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn test_map_priority() {
        assert!(matches!(map_priority(1), Some(NtfyPriority::Min)));
        assert!(matches!(map_priority(5), Some(NtfyPriority::Max)));
        assert!(map_priority(0).is_none());
        assert!(map_priority(6).is_none());
    }
}
