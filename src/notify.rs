//! Transient user-facing notifications ("toasts").

use serde::Serialize;
use std::sync::{Mutex, PoisonError};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Warning,
    Error,
}

/// One notification: a severity, the message key it was produced from and
/// the translated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub key: &'static str,
    pub message: String,
}

/// Receives notifications from a pipeline.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) {
        let _ = notification;
    }
}

/// Discards everything.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {}

/// Keeps every notification in order. Used by tests and by callers that
/// render notifications after the fact.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Keys only, in order.
    pub fn keys(&self) -> Vec<&'static str> {
        self.notifications().into_iter().map(|n| n.key).collect()
    }

    pub fn clear(&self) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}
