//! Authoritative owner of the authenticated-session state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use super::events::{SessionEvent, SessionEvents};
use super::refresh::TokenRefresher;
use crate::error::Result;
use crate::store::{PrefsStore, SecureStore};

/// Keyring service name for session secrets.
pub const SESSION_SERVICE: &str = "blueboxy";

/// How close to expiry a session must be before a refresh is attempted.
pub const REFRESH_THRESHOLD_SECS: i64 = 5 * 60;

const ACCOUNT_AUTH_TOKEN: &str = "auth_token";
const ACCOUNT_REFRESH_TOKEN: &str = "refresh_token";
const ACCOUNT_USER_ID: &str = "user_id";
const PREFS_CURRENT_USER: &str = "current_user";
const PREFS_SESSION_EXPIRY: &str = "session_expires_at";

/// The logged-in user's profile as the rest of the app sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  pub id: i64,
  pub name: String,
  pub email: String,
  #[serde(default)]
  pub partner_name: Option<String>,
  #[serde(default)]
  pub assessment_complete: bool,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
  user_id: Option<i64>,
  auth_token: Option<String>,
  refresh_token: Option<String>,
  current_user: Option<UserProfile>,
  expires_at: Option<DateTime<Utc>>,
}

impl SessionState {
  fn is_authenticated(&self) -> bool {
    let has_identity = self.user_id.is_some();
    let has_token = self.auth_token.as_deref().is_some_and(|t| !t.is_empty());
    let unexpired = self.expires_at.map_or(true, |exp| Utc::now() < exp);
    has_identity && has_token && unexpired
  }
}

/// An empty string must never act as a present credential.
fn normalize(token: Option<String>) -> Option<String> {
  token.filter(|t| !t.is_empty())
}

/// Single authoritative owner of "who is logged in, with what token".
///
/// One instance per running app, injected by the composition root and
/// shared behind an `Arc`. Tokens and the user id persist to the secure
/// store on every change; the profile and expiry persist to the prefs
/// store. Mutations and the background monitor are the only writers, so
/// transitions are totally ordered and last-writer-wins.
pub struct SessionStore {
  state: RwLock<SessionState>,
  secure: Arc<dyn SecureStore>,
  prefs: Arc<PrefsStore>,
  refresher: Arc<dyn TokenRefresher>,
  events: SessionEvents,
  // Two concurrent refreshes would spend the same refresh token
  refresh_lock: Mutex<()>,
}

impl SessionStore {
  /// Create an empty (unauthenticated) store.
  pub fn new(
    secure: Arc<dyn SecureStore>,
    prefs: Arc<PrefsStore>,
    refresher: Arc<dyn TokenRefresher>,
  ) -> Self {
    Self {
      state: RwLock::new(SessionState::default()),
      secure,
      prefs,
      refresher,
      events: SessionEvents::default(),
      refresh_lock: Mutex::new(()),
    }
  }

  /// Create a store and restore any persisted session from storage.
  pub async fn hydrate(
    secure: Arc<dyn SecureStore>,
    prefs: Arc<PrefsStore>,
    refresher: Arc<dyn TokenRefresher>,
  ) -> Result<Self> {
    let store = Self::new(secure, prefs, refresher);
    store.restore().await?;
    Ok(store)
  }

  async fn restore(&self) -> Result<()> {
    let auth_token = normalize(self.secure.load(ACCOUNT_AUTH_TOKEN).await?);
    let refresh_token = normalize(self.secure.load(ACCOUNT_REFRESH_TOKEN).await?);
    let user_id = self
      .secure
      .load(ACCOUNT_USER_ID)
      .await?
      .and_then(|v| v.parse::<i64>().ok());

    let current_user = match self.prefs.get(PREFS_CURRENT_USER)? {
      Some(json) => match serde_json::from_str(&json) {
        Ok(user) => Some(user),
        Err(e) => {
          warn!(error = %e, "Discarding unreadable persisted profile");
          None
        }
      },
      None => None,
    };

    let expires_at = self
      .prefs
      .get(PREFS_SESSION_EXPIRY)?
      .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
      .map(|dt| dt.with_timezone(&Utc));

    let mut state = self.state.write().await;
    *state = SessionState {
      user_id,
      auth_token,
      refresh_token,
      current_user,
      expires_at,
    };

    if state.is_authenticated() {
      debug!(user_id = ?state.user_id, "Restored authenticated session");
    }
    Ok(())
  }

  /// Subscribe to login/logout transitions.
  pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
    self.events.subscribe()
  }

  /// Replace the whole session atomically.
  ///
  /// Persists tokens and user id to secure storage and the profile to the
  /// prefs store, then emits a login event if authentication flipped on.
  pub async fn set_session(
    &self,
    user_id: i64,
    user: UserProfile,
    auth_token: &str,
    refresh_token: &str,
    expires_at: Option<DateTime<Utc>>,
  ) -> Result<()> {
    let was_authenticated = self.is_authenticated().await;

    {
      let mut state = self.state.write().await;
      *state = SessionState {
        user_id: Some(user_id),
        auth_token: normalize(Some(auth_token.to_string())),
        refresh_token: normalize(Some(refresh_token.to_string())),
        current_user: Some(user.clone()),
        expires_at,
      };
    }

    self.persist().await?;

    if !was_authenticated && self.is_authenticated().await {
      info!(user_id = user_id, "Session became authenticated");
      self.events.emit(SessionEvent::LoggedIn(user));
    }
    Ok(())
  }

  /// Update the profile without touching tokens or auth state.
  pub async fn update_user(&self, user: UserProfile) -> Result<()> {
    {
      let mut state = self.state.write().await;
      state.current_user = Some(user);
    }
    self.persist().await
  }

  /// Rotate tokens without changing user identity.
  pub async fn update_tokens(
    &self,
    auth_token: &str,
    refresh_token: &str,
    expires_at: Option<DateTime<Utc>>,
  ) -> Result<()> {
    {
      let mut state = self.state.write().await;
      state.auth_token = normalize(Some(auth_token.to_string()));
      state.refresh_token = normalize(Some(refresh_token.to_string()));
      state.expires_at = expires_at;
    }
    self.persist().await
  }

  /// Clear the session everywhere and emit a logout event.
  ///
  /// Logging out always succeeds locally; failures deleting persisted
  /// values are logged and do not keep the device signed in.
  pub async fn logout(&self) {
    {
      let mut state = self.state.write().await;
      *state = SessionState::default();
    }

    info!("Session logged out");
    self.events.emit(SessionEvent::LoggedOut);

    for account in [ACCOUNT_AUTH_TOKEN, ACCOUNT_REFRESH_TOKEN, ACCOUNT_USER_ID] {
      if let Err(e) = self.secure.delete(account).await {
        warn!(account = account, error = %e, "Failed to delete persisted secret");
      }
    }
    for key in [PREFS_CURRENT_USER, PREFS_SESSION_EXPIRY] {
      if let Err(e) = self.prefs.delete(key) {
        warn!(key = key, error = %e, "Failed to delete persisted value");
      }
    }
  }

  /// Whether the current state counts as authenticated: a user id, a
  /// non-empty auth token, and an unexpired (or absent) expiry.
  pub async fn is_authenticated(&self) -> bool {
    self.state.read().await.is_authenticated()
  }

  /// Validity predicate used by callers attaching a bearer token.
  pub async fn is_session_valid(&self) -> bool {
    self.is_authenticated().await
  }

  pub async fn user_id(&self) -> Option<i64> {
    self.state.read().await.user_id
  }

  pub async fn current_user(&self) -> Option<UserProfile> {
    self.state.read().await.current_user.clone()
  }

  /// The bearer token to attach to outbound requests, if any.
  pub async fn auth_token(&self) -> Option<String> {
    self.state.read().await.auth_token.clone()
  }

  pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
    self.state.read().await.expires_at
  }

  /// Refresh the session if it is close to expiring.
  ///
  /// Fails closed when no refresh token exists. When an expiry is set and
  /// falls within the refresh threshold, the backend refresher runs and
  /// the rotated tokens are stored; otherwise the current validity is
  /// returned unchanged. Returns whether the session is usable afterward.
  pub async fn refresh_session_if_needed(&self) -> bool {
    // Serialize refresh attempts; overlapping calls would spend the same
    // refresh token
    let _guard = self.refresh_lock.lock().await;

    let (refresh_token, expires_at) = {
      let state = self.state.read().await;
      (state.refresh_token.clone(), state.expires_at)
    };

    let refresh_token = match refresh_token {
      Some(token) => token,
      None => {
        debug!("No refresh token, failing closed");
        return false;
      }
    };

    let needs_refresh = match expires_at {
      Some(exp) => {
        exp.signed_duration_since(Utc::now()) <= chrono::Duration::seconds(REFRESH_THRESHOLD_SECS)
      }
      None => false,
    };
    if !needs_refresh {
      return self.is_session_valid().await;
    }

    match self.refresher.refresh(&refresh_token).await {
      Ok(tokens) => {
        let expires_at = tokens
          .expires_in
          .map(|secs| Utc::now() + chrono::Duration::seconds(secs as i64));
        // Backends may omit a rotated refresh token; keep the old one
        let new_refresh = if tokens.refresh_token.is_empty() {
          refresh_token
        } else {
          tokens.refresh_token
        };

        match self
          .update_tokens(&tokens.auth_token, &new_refresh, expires_at)
          .await
        {
          Ok(()) => {
            info!("Session tokens refreshed");
            true
          }
          Err(e) => {
            warn!(error = %e, "Failed to persist refreshed tokens");
            false
          }
        }
      }
      Err(e) => {
        warn!(error = %e, "Token refresh failed");
        false
      }
    }
  }

  async fn persist(&self) -> Result<()> {
    let state = self.state.read().await.clone();

    match &state.auth_token {
      Some(token) => self.secure.save(ACCOUNT_AUTH_TOKEN, token).await?,
      None => self.secure.delete(ACCOUNT_AUTH_TOKEN).await?,
    }
    match &state.refresh_token {
      Some(token) => self.secure.save(ACCOUNT_REFRESH_TOKEN, token).await?,
      None => self.secure.delete(ACCOUNT_REFRESH_TOKEN).await?,
    }
    match state.user_id {
      Some(id) => self.secure.save(ACCOUNT_USER_ID, &id.to_string()).await?,
      None => self.secure.delete(ACCOUNT_USER_ID).await?,
    }

    match &state.current_user {
      Some(user) => self.prefs.set(PREFS_CURRENT_USER, &serde_json::to_string(user)?)?,
      None => self.prefs.delete(PREFS_CURRENT_USER)?,
    }
    match state.expires_at {
      Some(exp) => self.prefs.set(PREFS_SESSION_EXPIRY, &exp.to_rfc3339())?,
      None => self.prefs.delete(PREFS_SESSION_EXPIRY)?,
    }

    Ok(())
  }
}
