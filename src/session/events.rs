//! Broadcast of session lifecycle transitions.

use tokio::sync::broadcast;

use super::store::UserProfile;

/// A session lifecycle transition.
#[derive(Debug, Clone)]
pub enum SessionEvent {
  /// The session became authenticated; carries the logged-in profile.
  LoggedIn(UserProfile),
  /// The session was cleared.
  LoggedOut,
}

/// Event emitter owned by the session store.
///
/// Listeners subscribe explicitly; there is no ambient notification bus.
/// Emitting with no live subscribers is a no-op.
pub struct SessionEvents {
  tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  /// Get a receiver for subsequent session events.
  pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
    self.tx.subscribe()
  }

  pub(crate) fn emit(&self, event: SessionEvent) {
    // Send fails only when nobody is listening, which is fine
    let _ = self.tx.send(event);
  }
}

impl Default for SessionEvents {
  fn default() -> Self {
    Self::new(16)
  }
}
