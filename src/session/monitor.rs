//! Background session validity monitor.
//!
//! The only autonomous state transition in the crate: a periodic check
//! that refreshes an expiring session and forces a logout when refresh is
//! no longer possible. Refresh attempts cannot overlap - the store's own
//! refresh lock serializes them, and this task is the sole periodic
//! caller.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use super::store::SessionStore;

/// Default cadence of the validity check.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(60);

/// Handle to the spawned monitor task.
///
/// The owning process stops the monitor by calling [`stop`] (or simply
/// dropping the handle), e.g. when the app moves to the background; the
/// timer must not keep waking a backgrounded process.
///
/// [`stop`]: SessionMonitor::stop
pub struct SessionMonitor {
  handle: JoinHandle<()>,
}

impl SessionMonitor {
  /// Start monitoring with the default 60-second cadence.
  pub fn start(store: Arc<SessionStore>) -> Self {
    Self::with_interval(store, DEFAULT_MONITOR_INTERVAL)
  }

  /// Start monitoring with a custom cadence.
  pub fn with_interval(store: Arc<SessionStore>, period: Duration) -> Self {
    let handle = tokio::spawn(async move {
      let mut interval = tokio::time::interval(period);
      // The first tick completes immediately; consume it so checks start
      // one full period after startup
      interval.tick().await;

      loop {
        interval.tick().await;

        if !store.is_authenticated().await {
          continue;
        }
        if !store.refresh_session_if_needed().await {
          warn!("Session could not be refreshed, logging out");
          store.logout().await;
        }
      }
    });

    Self { handle }
  }

  /// Stop the monitor. Further ticks will not fire.
  pub fn stop(&self) {
    self.handle.abort();
  }
}

impl Drop for SessionMonitor {
  fn drop(&mut self) {
    self.handle.abort();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::session::events::SessionEvent;
  use crate::session::refresh::StaticRefresher;
  use crate::session::store::UserProfile;
  use crate::store::{MemorySecureStore, PrefsStore};
  use chrono::Utc;
  use tempfile::TempDir;

  fn profile() -> UserProfile {
    UserProfile {
      id: 1,
      name: "Alex".to_string(),
      email: "alex@example.com".to_string(),
      partner_name: None,
      assessment_complete: false,
    }
  }

  fn store_with_failing_refresh(dir: &TempDir) -> Arc<SessionStore> {
    Arc::new(SessionStore::new(
      Arc::new(MemorySecureStore::new()),
      Arc::new(PrefsStore::open(&dir.path().join("prefs.db")).unwrap()),
      Arc::new(StaticRefresher::failing("revoked")),
    ))
  }

  #[tokio::test]
  async fn test_failed_refresh_forces_one_logout() {
    let dir = TempDir::new().unwrap();
    let store = store_with_failing_refresh(&dir);
    let mut events = store.subscribe();

    // Expiring inside the refresh threshold, so the monitor must attempt
    // a refresh, see it fail, and log out exactly once
    store
      .set_session(
        1,
        profile(),
        "t1",
        "r1",
        Some(Utc::now() + chrono::Duration::minutes(2)),
      )
      .await
      .unwrap();

    let monitor = SessionMonitor::with_interval(store.clone(), Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(120)).await;
    monitor.stop();

    assert!(!store.is_session_valid().await);

    let mut logouts = 0;
    while let Ok(event) = events.try_recv() {
      if matches!(event, SessionEvent::LoggedOut) {
        logouts += 1;
      }
    }
    assert_eq!(logouts, 1);
  }

  #[tokio::test]
  async fn test_healthy_session_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let store = store_with_failing_refresh(&dir);
    let mut events = store.subscribe();

    store
      .set_session(
        1,
        profile(),
        "t1",
        "r1",
        Some(Utc::now() + chrono::Duration::hours(4)),
      )
      .await
      .unwrap();

    let _monitor = SessionMonitor::with_interval(store.clone(), Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(store.is_session_valid().await);
    assert!(matches!(
      events.try_recv().unwrap(),
      SessionEvent::LoggedIn(_)
    ));
    assert!(events.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_stopped_monitor_takes_no_action() {
    let dir = TempDir::new().unwrap();
    let store = store_with_failing_refresh(&dir);

    store
      .set_session(
        1,
        profile(),
        "t1",
        "r1",
        Some(Utc::now() + chrono::Duration::minutes(2)),
      )
      .await
      .unwrap();

    let monitor = SessionMonitor::with_interval(store.clone(), Duration::from_millis(20));
    monitor.stop();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Stopped before any tick could run; the session is untouched
    assert!(store.is_session_valid().await);
  }
}
