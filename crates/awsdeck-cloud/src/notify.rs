//! Notification sink
//!
//! The orchestrator reports every attempted action and its outcome as a
//! human-readable [`Notification`]. The dashboard drains the receiving end.

use crate::error::CloudError;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationLevel::Info => write!(f, "info"),
            NotificationLevel::Success => write!(f, "ok"),
            NotificationLevel::Warning => write!(f, "warn"),
            NotificationLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub resource_id: Option<String>,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            resource_id: None,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn for_resource(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    /// Failure notification; recoverable errors become warnings.
    pub fn from_error(context: impl fmt::Display, err: &CloudError) -> Self {
        let level = if err.is_recoverable() {
            NotificationLevel::Warning
        } else {
            NotificationLevel::Error
        };
        Self::new(level, format!("{}: {}", context, err))
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Sending half of the notification channel
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn notify(&self, notification: Notification) {
        tracing::debug!(level = %notification.level, "{}", notification.message);
        // A closed receiver means the dashboard is gone; nothing to report to.
        let _ = self.tx.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_error_levels() {
        let warn = Notification::from_error(
            "Attach address",
            &CloudError::QuotaExceeded("AddressLimitExceeded".into()),
        );
        assert_eq!(warn.level, NotificationLevel::Warning);
        assert_eq!(
            warn.message,
            "Attach address: Quota exceeded: AddressLimitExceeded"
        );

        let err = Notification::from_error("Refresh", &CloudError::ProviderUnavailable("x".into()));
        assert_eq!(err.level, NotificationLevel::Error);
    }

    #[tokio::test]
    async fn test_notifier_delivers_in_order() {
        let (notifier, mut rx) = Notifier::channel();
        notifier.notify(Notification::new(NotificationLevel::Info, "first"));
        notifier.notify(Notification::new(NotificationLevel::Success, "second"));

        assert_eq!(rx.recv().await.unwrap().message, "first");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.level, NotificationLevel::Success);
        assert_eq!(second.message, "second");
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (notifier, rx) = Notifier::channel();
        drop(rx);
        notifier.notify(Notification::new(NotificationLevel::Error, "nobody listening"));
    }
}
