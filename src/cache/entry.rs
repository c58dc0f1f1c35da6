//! Cache entry envelope with creation timestamp and optional expiration.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A cached value wrapped with its expiration metadata.
///
/// The stored `timestamp` is the single source of truth for an entry's age
/// on every tier; both the in-memory map and the on-disk files check the
/// same field, so an entry cannot expire at different times depending on
/// where it happens to live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
  /// The cached value.
  pub data: T,
  /// When the entry was created.
  pub timestamp: DateTime<Utc>,
  /// Time-to-live in milliseconds. `None` means the entry never expires.
  pub expiration_ms: Option<u64>,
}

impl<T> CacheEntry<T> {
  /// Create a new entry stamped with the current time.
  pub fn new(data: T, expiration: Option<Duration>) -> Self {
    Self {
      data,
      timestamp: Utc::now(),
      expiration_ms: expiration.map(|d| d.as_millis() as u64),
    }
  }

  /// Whether the entry has outlived its expiration.
  ///
  /// Entries without an expiration never expire. A timestamp in the future
  /// (clock rollback) reads as expired rather than fresh.
  pub fn is_expired(&self) -> bool {
    match self.expiration_ms {
      None => false,
      Some(ms) => {
        let elapsed = Utc::now()
          .signed_duration_since(self.timestamp)
          .to_std()
          .unwrap_or(Duration::MAX);
        elapsed > Duration::from_millis(ms)
      }
    }
  }
}

/// Type-erased entry as it crosses the tier boundary.
///
/// A single tier holds payloads of arbitrary types; erasing them to
/// `serde_json::Value` keeps the downcast on read checked and total - a
/// payload that fails to decode is a cache miss, never a panic.
pub type RawEntry = CacheEntry<serde_json::Value>;

impl RawEntry {
  /// Erase a typed value into a raw entry.
  pub fn encode<T: Serialize>(value: &T, expiration: Option<Duration>) -> Result<RawEntry> {
    Ok(CacheEntry::new(serde_json::to_value(value)?, expiration))
  }

  /// Recover the typed payload.
  pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
    Ok(serde_json::from_value(self.data.clone())?)
  }

  /// Rough in-memory footprint, used for size accounting.
  pub fn estimated_size(&self) -> usize {
    serde_json::to_string(&self.data)
      .map(|s| s.len())
      .unwrap_or(0)
      + 48
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_entry_without_expiration_never_expires() {
    let mut entry = CacheEntry::new("v", None);
    entry.timestamp = Utc::now() - chrono::Duration::days(365);
    assert!(!entry.is_expired());
  }

  #[test]
  fn test_expiration_boundary() {
    let ttl = Duration::from_millis(500);

    // Just inside the window
    let mut entry = CacheEntry::new("v", Some(ttl));
    entry.timestamp = Utc::now() - chrono::Duration::milliseconds(480);
    assert!(!entry.is_expired());

    // Just past the window
    let mut entry = CacheEntry::new("v", Some(ttl));
    entry.timestamp = Utc::now() - chrono::Duration::milliseconds(520);
    assert!(entry.is_expired());
  }

  #[test]
  fn test_future_timestamp_reads_as_expired() {
    let mut entry = CacheEntry::new("v", Some(Duration::from_secs(60)));
    entry.timestamp = Utc::now() + chrono::Duration::hours(1);
    assert!(entry.is_expired());
  }

  #[test]
  fn test_encode_decode_round_trip() {
    let raw = RawEntry::encode(&vec![1u32, 2, 3], Some(Duration::from_secs(10))).unwrap();
    let back: Vec<u32> = raw.decode().unwrap();
    assert_eq!(back, vec![1, 2, 3]);
  }

  #[test]
  fn test_decode_mismatch_is_an_error() {
    let raw = RawEntry::encode(&"not a number", None).unwrap();
    assert!(raw.decode::<u64>().is_err());
  }
}
