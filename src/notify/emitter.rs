use std::sync::Mutex;

use event_emitter_rs::EventEmitter;

use super::{Notification, Notifier};

/// Event name used for every notification.
pub const NOTIFICATION_EVENT: &str = "notification";

/// A notifier that emits via an `EventEmitter` for in-process subscribers
/// (toast renderers, status bars).
///
/// Payloads travel as JSON strings; listeners run on emitter threads, so
/// delivery is asynchronous.
pub struct EmitterNotifier {
    emitter: Mutex<EventEmitter>,
}

impl Default for EmitterNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EmitterNotifier {
    pub fn new() -> Self {
        Self::with_emitter(EventEmitter::new())
    }

    pub fn with_emitter(emitter: EventEmitter) -> Self {
        Self {
            emitter: Mutex::new(emitter),
        }
    }

    /// Register a listener. Returns the listener id.
    pub fn on_notification<F>(&self, listener: F) -> String
    where
        F: Fn(Notification) + Send + Sync + 'static,
    {
        let mut emitter = match self.emitter.lock() {
            Ok(emitter) => emitter,
            Err(poisoned) => poisoned.into_inner(),
        };
        emitter.on(NOTIFICATION_EVENT, move |payload: String| {
            match serde_json::from_str::<Notification>(&payload) {
                Ok(notification) => listener(notification),
                Err(e) => tracing::warn!("dropping malformed notification payload: {}", e),
            }
        })
    }
}

impl Notifier for EmitterNotifier {
    fn notify(&self, notification: Notification) {
        let payload = match serde_json::to_string(&notification) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("could not encode notification: {}", e);
                return;
            }
        };
        match self.emitter.lock() {
            Ok(mut emitter) => {
                emitter.emit(NOTIFICATION_EVENT, payload);
            }
            Err(poisoned) => {
                poisoned.into_inner().emit(NOTIFICATION_EVENT, payload);
            }
        }
    }
}
