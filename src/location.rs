//! Last-known device location, cached with a short freshness window.
//!
//! Consumers of the cache use the shared entry expiration rather than
//! rolling their own timestamp checks; this type is the canonical example.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheManager, CacheStrategy};

/// Cache key for the device's last resolved location.
pub const LOCATION_CACHE_KEY: &str = "last_known_location";

/// Locations older than this are not worth showing.
pub const LOCATION_FRESHNESS: Duration = Duration::from_secs(5 * 60);

/// A geocoded device location as last resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedLocation {
  pub latitude: f64,
  pub longitude: f64,
  /// Human-readable place name from reverse geocoding.
  pub display_name: String,
  /// When the location was resolved.
  pub timestamp: DateTime<Utc>,
}

impl CachedLocation {
  pub fn new(latitude: f64, longitude: f64, display_name: &str) -> Self {
    Self {
      latitude,
      longitude,
      display_name: display_name.to_string(),
      timestamp: Utc::now(),
    }
  }

  /// Cache this location under the shared key with the freshness window.
  pub async fn store(&self, cache: &CacheManager) {
    cache
      .save(
        LOCATION_CACHE_KEY,
        self,
        CacheStrategy::memory_only().with_expiration(LOCATION_FRESHNESS),
      )
      .await;
  }

  /// The last cached location, if still fresh.
  pub async fn last_known(cache: &CacheManager) -> Option<Self> {
    cache
      .load(LOCATION_CACHE_KEY, CacheStrategy::memory_only())
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[tokio::test]
  async fn test_store_and_recall() {
    let dir = TempDir::new().unwrap();
    let cache = CacheManager::new(dir.path().to_path_buf());

    assert_eq!(CachedLocation::last_known(&cache).await, None);

    let location = CachedLocation::new(40.7128, -74.0060, "New York, NY");
    location.store(&cache).await;

    let recalled = CachedLocation::last_known(&cache).await.unwrap();
    assert_eq!(recalled, location);
  }

  #[tokio::test]
  async fn test_stale_location_is_not_served() {
    let dir = TempDir::new().unwrap();
    let cache = CacheManager::new(dir.path().to_path_buf());

    let location = CachedLocation::new(51.5074, -0.1278, "London");
    // Simulate an old fix by saving with an already tight window
    cache
      .save(
        LOCATION_CACHE_KEY,
        &location,
        CacheStrategy::memory_only().with_expiration(Duration::from_millis(30)),
      )
      .await;

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(CachedLocation::last_known(&cache).await, None);
  }
}
