//! The contract shared by both cache backing stores.

use async_trait::async_trait;

use super::entry::RawEntry;
use crate::error::Result;

/// One backing store (memory or disk) behind the unified cache interface.
///
/// Entries cross this boundary type-erased; expiration is checked against
/// the envelope's stored timestamp identically by every implementation.
/// Implementations return errors honestly - absorbing them into misses is
/// the manager's job, so the cache never becomes the reason a fetch fails.
#[async_trait]
pub trait CacheTier: Send + Sync {
  /// Insert or overwrite an entry.
  async fn save(&self, key: &str, entry: RawEntry) -> Result<()>;

  /// Fetch an entry. An expired hit is evicted and reported as a miss.
  async fn load(&self, key: &str) -> Result<Option<RawEntry>>;

  /// Remove an entry. Removing an absent key is not an error.
  async fn remove(&self, key: &str) -> Result<()>;

  /// Remove every entry.
  async fn clear(&self) -> Result<()>;

  /// Whether the entry under `key` has expired. A missing key reads as
  /// expired: there is nothing valid to serve.
  async fn is_expired(&self, key: &str) -> bool;

  /// Current footprint in bytes (estimate for memory, measured for disk).
  async fn size_bytes(&self) -> u64;

  /// Drop expired entries and, where the tier has a size budget, shrink
  /// back under it.
  async fn cleanup(&self) -> Result<()>;
}
