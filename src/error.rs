//! Error types for the BlueBoxy core.
//!
//! A cache miss is not an error anywhere in this crate - cache lookups
//! return `Option` and absorb their own failures. The variants here cover
//! the cases that do matter: storage and serialization problems, and the
//! session-layer failures that must surface as state transitions.

use thiserror::Error;

/// Error type for cache, storage, and session operations.
///
/// All variants carry owned strings so the type stays `Clone`; a
/// [`Loadable`](crate::loadable::Loadable) holds one directly in its
/// failed state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// A value could not be encoded or decoded for storage.
  #[error("Serialization failed: {0}")]
  Serialization(String),

  /// Underlying storage failed (filesystem, database, or keychain).
  #[error("Storage error: {0}")]
  Storage(String),

  /// Configuration file missing or malformed.
  #[error("Configuration error: {0}")]
  Config(String),

  /// The session is missing, expired, or otherwise not authenticated.
  #[error("Session is not authenticated")]
  AuthExpired,

  /// The token-refresh call failed or no refresh token exists.
  #[error("Token refresh failed: {0}")]
  Refresh(String),

  /// Network request to the backend failed.
  #[error("Network error: {0}")]
  Network(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Error::Serialization(e.to_string())
  }
}

impl From<std::io::Error> for Error {
  fn from(e: std::io::Error) -> Self {
    Error::Storage(e.to_string())
  }
}

impl From<rusqlite::Error> for Error {
  fn from(e: rusqlite::Error) -> Self {
    Error::Storage(e.to_string())
  }
}

impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self {
    Error::Network(e.to_string())
  }
}
