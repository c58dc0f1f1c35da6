//! Token refresh against the backend.
//!
//! The refresh endpoint is the only backend integration point in this
//! crate; everything else treats the backend as an opaque collaborator.
//! The seam is a trait so tests run against a canned implementation.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Token pair returned by a successful refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedTokens {
  pub auth_token: String,
  /// Backends may omit a rotated refresh token; the caller keeps the old
  /// one in that case.
  #[serde(default)]
  pub refresh_token: String,
  /// Seconds until the new auth token expires.
  #[serde(default)]
  pub expires_in: Option<u64>,
}

/// Exchanges a refresh token for a fresh token pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
  async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens>;
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
  grant_type: &'a str,
  refresh_token: &'a str,
}

/// Production refresher: JSON POST to the backend's refresh endpoint.
pub struct HttpTokenRefresher {
  client: reqwest::Client,
  endpoint: Url,
}

impl HttpTokenRefresher {
  pub fn new(endpoint: Url) -> Self {
    Self {
      client: reqwest::Client::new(),
      endpoint,
    }
  }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
  async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens> {
    let request_body = RefreshRequest {
      grant_type: "refresh_token",
      refresh_token,
    };

    let response = self
      .client
      .post(self.endpoint.clone())
      .json(&request_body)
      .send()
      .await
      .map_err(|e| Error::Network(format!("Token refresh request failed: {}", e)))?;

    if !response.status().is_success() {
      let status = response.status();
      let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
      return Err(Error::Refresh(format!("{}: {}", status, error_text)));
    }

    response
      .json::<RefreshedTokens>()
      .await
      .map_err(|e| Error::Refresh(format!("Failed to parse refresh response: {}", e)))
  }
}

/// Canned refresher for tests: returns a fixed outcome and counts calls.
pub struct StaticRefresher {
  outcome: Mutex<Result<RefreshedTokens>>,
  calls: AtomicU32,
}

impl StaticRefresher {
  pub fn succeeding(tokens: RefreshedTokens) -> Self {
    Self {
      outcome: Mutex::new(Ok(tokens)),
      calls: AtomicU32::new(0),
    }
  }

  pub fn failing(message: &str) -> Self {
    Self {
      outcome: Mutex::new(Err(Error::Refresh(message.to_string()))),
      calls: AtomicU32::new(0),
    }
  }

  /// How many times `refresh` was invoked.
  pub fn calls(&self) -> u32 {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl TokenRefresher for StaticRefresher {
  async fn refresh(&self, _refresh_token: &str) -> Result<RefreshedTokens> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self
      .outcome
      .lock()
      .map_err(|e| Error::Refresh(format!("Lock poisoned: {}", e)))?
      .clone()
  }
}
