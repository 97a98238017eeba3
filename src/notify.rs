//! User-facing notifications.
//!
//! The executor only decides *that* a notification is due and *what* it says.
//! A [`Notifier`] at the boundary decides how it is shown.

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A notification suggested by a classified call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

/// Presents notifications. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);

    fn error(&self, message: &str);

    /// Routes a notification to [`Notifier::success`] or [`Notifier::error`].
    fn notify(&self, notification: &Notification) {
        match notification.kind {
            NotificationKind::Success => self.success(&notification.message),
            NotificationKind::Error => self.error(&notification.message),
        }
    }
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn success(&self, message: &str) {
        (**self).success(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

/// Renders notifications as `tracing` events. The default notifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(notification = "success", text = message, "Notification");
    }

    fn error(&self, message: &str) {
        tracing::warn!(notification = "error", text = message, "Notification");
    }
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn success(&self, _message: &str) {}

    fn error(&self, _message: &str) {}
}
