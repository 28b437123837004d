use std::sync::{Arc, Mutex};

use super::{Notification, Notifier, Severity};

/// Writes notifications to the `tracing` log at a level matching severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, n: Notification) {
        match n.severity {
            Severity::Error => tracing::error!(title = %n.title, "{}", n.message),
            Severity::Warning => tracing::warn!(title = %n.title, "{}", n.message),
            Severity::Info | Severity::Success => {
                tracing::info!(title = %n.title, severity = %n.severity, "{}", n.message)
            }
        }
    }
}

/// Drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: Notification) {}
}

/// Collects notifications into a shared buffer.
///
/// Clone-friendly via Arc; clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferNotifier {
    buffer: Arc<Mutex<Vec<Notification>>>,
}

impl BufferNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer: Arc<Mutex<Vec<Notification>>>) -> Self {
        Self { buffer }
    }

    /// Copy of everything received so far.
    pub fn notifications(&self) -> Vec<Notification> {
        match self.buffer.lock() {
            Ok(buffer) => buffer.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Remove and return everything received so far.
    pub fn drain(&self) -> Vec<Notification> {
        match self.buffer.lock() {
            Ok(mut buffer) => buffer.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.notifications().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for BufferNotifier {
    fn notify(&self, notification: Notification) {
        match self.buffer.lock() {
            Ok(mut buffer) => buffer.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}
