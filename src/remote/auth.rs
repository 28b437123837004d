//! Bearer tokens supplied by the session collaborator.

use std::sync::{Arc, RwLock};

/// Supplies the bearer token attached to each outgoing request.
///
/// Called per request, so a session can rotate or clear its token without
/// rebuilding the remote.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// No authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenSource for NoToken {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// A token held by the owning session. Clones share the token.
#[derive(Debug, Clone, Default)]
pub struct StaticToken {
    token: Arc<RwLock<Option<String>>>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
        }
    }

    /// Replace the token (e.g. after a refresh).
    pub fn set(&self, token: impl Into<String>) {
        match self.token.write() {
            Ok(mut slot) => *slot = Some(token.into()),
            Err(poisoned) => *poisoned.into_inner() = Some(token.into()),
        }
    }

    /// Forget the token (e.g. on sign-out).
    pub fn clear(&self) {
        match self.token.write() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl TokenSource for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        match self.token.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
