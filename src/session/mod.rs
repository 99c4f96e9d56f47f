//! Session Signal
//!
//! Outward notification that the authenticated session has ended. The host
//! application reacts by returning the user to an unauthenticated surface.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::{GatewayError, SessionError};

/// Why the session was invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationReason {
    /// A 401 arrived and no refresh credential was stored.
    MissingRefreshToken,
    /// The renewal call failed.
    RenewalFailed(GatewayError),
    /// A request was rejected again after being replayed with a fresh credential.
    ReplayRejected,
}

impl InvalidationReason {
    /// Classify a session-terminal error.
    pub fn from_error(error: &GatewayError) -> Self {
        match error {
            GatewayError::Session(SessionError::NoRefreshToken) => Self::MissingRefreshToken,
            GatewayError::Session(SessionError::ReplayUnauthorized) => Self::ReplayRejected,
            other => Self::RenewalFailed(other.clone()),
        }
    }

    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRefreshToken => "missing_refresh_token",
            Self::RenewalFailed(_) => "renewal_failed",
            Self::ReplayRejected => "replay_rejected",
        }
    }
}

/// Session invalidation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInvalidated {
    pub reason: InvalidationReason,
    pub at: DateTime<Utc>,
}

impl SessionInvalidated {
    /// Create event stamped now.
    pub fn new(reason: InvalidationReason) -> Self {
        Self {
            reason,
            at: Utc::now(),
        }
    }
}

/// Receiver of session invalidation.
///
/// Called at most once per session, from whichever task observed the
/// terminal failure. Implementations must not block.
pub trait SessionListener: Send + Sync {
    fn on_session_invalidated(&self, event: &SessionInvalidated);
}

/// No-op listener.
pub struct NoOpSessionListener;

impl SessionListener for NoOpSessionListener {
    fn on_session_invalidated(&self, _event: &SessionInvalidated) {}
}

/// Listener that fans events out to broadcast subscribers.
pub struct BroadcastSessionListener {
    sender: broadcast::Sender<SessionInvalidated>,
}

impl BroadcastSessionListener {
    /// Create listener buffering up to `capacity` undelivered events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionInvalidated> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastSessionListener {
    fn default() -> Self {
        Self::new(16)
    }
}

impl SessionListener for BroadcastSessionListener {
    fn on_session_invalidated(&self, event: &SessionInvalidated) {
        // No subscribers is fine.
        let _ = self.sender.send(event.clone());
    }
}

/// Mock listener for testing.
#[derive(Default)]
pub struct MockSessionListener {
    events: Mutex<Vec<SessionInvalidated>>,
}

impl MockSessionListener {
    /// Create new mock listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far.
    pub fn get_events(&self) -> Vec<SessionInvalidated> {
        self.events.lock().clone()
    }

    /// Number of events received.
    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

impl SessionListener for MockSessionListener {
    fn on_session_invalidated(&self, event: &SessionInvalidated) {
        self.events.lock().push(event.clone());
    }
}
