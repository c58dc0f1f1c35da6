//! Cache manager that orchestrates the memory and disk tiers.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::disk::DiskTier;
use super::entry::RawEntry;
use super::memory::{MemoryTier, DEFAULT_CAPACITY};
use super::tier::CacheTier;

/// Expiration applied when a strategy does not carry its own.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(3600);

/// Total size budget (memory estimate + disk measurement) before a cleanup
/// pass is triggered.
pub const DEFAULT_SIZE_BUDGET_BYTES: u64 = 100 * 1024 * 1024;

/// Which tier(s) a save or load touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
  /// Fast, process-lifetime only.
  MemoryOnly { expiration: Option<Duration> },
  /// Durable across restarts, slower.
  DiskOnly { expiration: Option<Duration> },
  /// Write both; read memory first and warm it from disk hits.
  Hybrid { expiration: Option<Duration> },
}

impl CacheStrategy {
  pub fn memory_only() -> Self {
    CacheStrategy::MemoryOnly { expiration: None }
  }

  pub fn disk_only() -> Self {
    CacheStrategy::DiskOnly { expiration: None }
  }

  pub fn hybrid() -> Self {
    CacheStrategy::Hybrid { expiration: None }
  }

  /// Override the expiration, keeping the tier choice.
  pub fn with_expiration(self, expiration: Duration) -> Self {
    match self {
      CacheStrategy::MemoryOnly { .. } => CacheStrategy::MemoryOnly {
        expiration: Some(expiration),
      },
      CacheStrategy::DiskOnly { .. } => CacheStrategy::DiskOnly {
        expiration: Some(expiration),
      },
      CacheStrategy::Hybrid { .. } => CacheStrategy::Hybrid {
        expiration: Some(expiration),
      },
    }
  }

  fn expiration(&self) -> Duration {
    match self {
      CacheStrategy::MemoryOnly { expiration }
      | CacheStrategy::DiskOnly { expiration }
      | CacheStrategy::Hybrid { expiration } => expiration.unwrap_or(DEFAULT_EXPIRATION),
    }
  }
}

/// Single entry point for cached reads and writes.
///
/// No method here returns an error: the cache is always optional relative
/// to the source of truth, so every failure degrades to a miss or a no-op
/// and is logged. One instance per running app, injected by the composition
/// root; clones share the same tiers.
pub struct CacheManager {
  memory: MemoryTier,
  disk: DiskTier,
  size_budget: u64,
  is_clearing: Arc<AtomicBool>,
}

impl CacheManager {
  /// Create a manager with default capacity and budget, caching to `dir`.
  pub fn new(dir: PathBuf) -> Self {
    Self {
      memory: MemoryTier::new(DEFAULT_CAPACITY),
      disk: DiskTier::new(dir),
      size_budget: DEFAULT_SIZE_BUDGET_BYTES,
      is_clearing: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Cap the number of in-memory entries.
  pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
    self.memory = MemoryTier::new(capacity);
    self
  }

  /// Set the total size budget that triggers cleanup.
  pub fn with_size_budget(mut self, bytes: u64) -> Self {
    self.size_budget = bytes;
    self.disk = self.disk.clone().with_budget(bytes);
    self
  }

  /// Cache a value under `key` per the strategy's tier choice.
  ///
  /// Hybrid writes both tiers unconditionally, memory first; the tiers are
  /// eventually consistent and a crash between the writes leaves them
  /// divergent, which is acceptable for a cache that is not a system of
  /// record.
  pub async fn save<T: Serialize>(&self, key: &str, value: &T, strategy: CacheStrategy) {
    let entry = match RawEntry::encode(value, Some(strategy.expiration())) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(key = %key, error = %e, "Failed to encode value for caching");
        return;
      }
    };

    match strategy {
      CacheStrategy::MemoryOnly { .. } => {
        self.absorb(self.memory.save(key, entry).await, key, "memory");
      }
      CacheStrategy::DiskOnly { .. } => {
        self.absorb(self.disk.save(key, entry).await, key, "disk");
      }
      CacheStrategy::Hybrid { .. } => {
        self.absorb(self.memory.save(key, entry.clone()).await, key, "memory");
        self.absorb(self.disk.save(key, entry).await, key, "disk");
      }
    }

    self.enforce_budget().await;
  }

  /// Look up a cached value. Expired or undecodable entries are misses.
  ///
  /// With the hybrid strategy, a disk hit is promoted into memory before
  /// returning so subsequent reads take the fast path.
  pub async fn load<T: DeserializeOwned>(&self, key: &str, strategy: CacheStrategy) -> Option<T> {
    let entry = match strategy {
      CacheStrategy::MemoryOnly { .. } => self.tier_load(&self.memory, key, "memory").await,
      CacheStrategy::DiskOnly { .. } => self.tier_load(&self.disk, key, "disk").await,
      CacheStrategy::Hybrid { .. } => {
        match self.tier_load(&self.memory, key, "memory").await {
          Some(entry) => Some(entry),
          None => {
            let entry = self.tier_load(&self.disk, key, "disk").await?;
            debug!(key = %key, "Promoting disk cache hit into memory");
            self.absorb(self.memory.save(key, entry.clone()).await, key, "memory");
            self.enforce_budget().await;
            Some(entry)
          }
        }
      }
    }?;

    match entry.decode::<T>() {
      Ok(value) => Some(value),
      Err(e) => {
        warn!(key = %key, error = %e, "Failed to decode cached value");
        None
      }
    }
  }

  /// Remove `key` from both tiers, regardless of strategy.
  pub async fn remove(&self, key: &str) {
    self.absorb(self.memory.remove(key).await, key, "memory");
    self.absorb(self.disk.remove(key).await, key, "disk");
  }

  /// Drop everything from both tiers.
  pub async fn clear(&self) {
    self.is_clearing.store(true, Ordering::SeqCst);

    self.absorb(self.memory.clear().await, "*", "memory");
    self.absorb(self.disk.clear().await, "*", "disk");

    self.is_clearing.store(false, Ordering::SeqCst);
  }

  /// Whether a clear pass is in flight, for UI feedback.
  pub fn is_clearing(&self) -> bool {
    self.is_clearing.load(Ordering::SeqCst)
  }

  /// Combined footprint of both tiers.
  pub async fn total_size_bytes(&self) -> u64 {
    self.memory.size_bytes().await + self.disk.size_bytes().await
  }

  async fn tier_load<C: CacheTier>(&self, tier: &C, key: &str, name: &str) -> Option<RawEntry> {
    match tier.load(key).await {
      Ok(entry) => entry,
      Err(e) => {
        warn!(key = %key, tier = name, error = %e, "Cache load failed, treating as miss");
        None
      }
    }
  }

  fn absorb(&self, result: crate::error::Result<()>, key: &str, tier: &str) {
    if let Err(e) = result {
      warn!(key = %key, tier = tier, error = %e, "Cache operation failed, continuing");
    }
  }

  /// Recompute total size and run each tier's own sweep when over budget.
  /// There is no cross-tier eviction policy.
  async fn enforce_budget(&self) {
    let total = self.total_size_bytes().await;
    if total <= self.size_budget {
      return;
    }

    debug!(
      total_bytes = total,
      budget_bytes = self.size_budget,
      "Cache over size budget, running cleanup"
    );
    if let Err(e) = self.memory.cleanup().await {
      warn!(error = %e, "Memory cache cleanup failed");
    }
    if let Err(e) = self.disk.cleanup().await {
      warn!(error = %e, "Disk cache cleanup failed");
    }
  }
}

impl Clone for CacheManager {
  fn clone(&self) -> Self {
    Self {
      memory: self.memory.clone(),
      disk: self.disk.clone(),
      size_budget: self.size_budget,
      is_clearing: Arc::clone(&self.is_clearing),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;
  use tempfile::TempDir;

  fn manager(dir: &TempDir) -> CacheManager {
    CacheManager::new(dir.path().to_path_buf())
  }

  #[tokio::test]
  async fn test_round_trip_per_strategy() {
    let dir = TempDir::new().unwrap();
    let cache = manager(&dir);

    for (key, strategy) in [
      ("m", CacheStrategy::memory_only()),
      ("d", CacheStrategy::disk_only()),
      ("h", CacheStrategy::hybrid()),
    ] {
      cache.save(key, &format!("value-{}", key), strategy).await;
      let loaded: Option<String> = cache.load(key, strategy).await;
      assert_eq!(loaded.as_deref(), Some(format!("value-{}", key).as_str()));
    }
  }

  #[tokio::test]
  async fn test_memory_entry_expires() {
    let dir = TempDir::new().unwrap();
    let cache = manager(&dir);

    let strategy = CacheStrategy::memory_only().with_expiration(Duration::from_millis(80));
    cache.save("k", &"abc", strategy).await;

    let loaded: Option<String> = cache.load("k", strategy).await;
    assert_eq!(loaded.as_deref(), Some("abc"));

    tokio::time::sleep(Duration::from_millis(150)).await;
    let loaded: Option<String> = cache.load("k", strategy).await;
    assert_eq!(loaded, None);
  }

  #[tokio::test]
  async fn test_disk_entries_survive_a_fresh_manager() {
    let dir = TempDir::new().unwrap();

    let cache = manager(&dir);
    cache.save("k2", &"x", CacheStrategy::disk_only()).await;
    drop(cache);

    let fresh = manager(&dir);
    let loaded: Option<String> = fresh.load("k2", CacheStrategy::disk_only()).await;
    assert_eq!(loaded.as_deref(), Some("x"));
  }

  #[tokio::test]
  async fn test_hybrid_load_promotes_disk_hit_into_memory() {
    let dir = TempDir::new().unwrap();
    let cache = manager(&dir);

    // Present only on disk
    cache.save("k3", &42u32, CacheStrategy::disk_only()).await;
    let miss: Option<u32> = cache.load("k3", CacheStrategy::memory_only()).await;
    assert_eq!(miss, None);

    // Hybrid read warms memory
    let hit: Option<u32> = cache.load("k3", CacheStrategy::hybrid()).await;
    assert_eq!(hit, Some(42));

    let warmed: Option<u32> = cache.load("k3", CacheStrategy::memory_only()).await;
    assert_eq!(warmed, Some(42));
  }

  #[tokio::test]
  async fn test_hybrid_save_writes_both_tiers() {
    let dir = TempDir::new().unwrap();
    let cache = manager(&dir);

    cache.save("k4", &"both", CacheStrategy::hybrid()).await;

    let from_memory: Option<String> = cache.load("k4", CacheStrategy::memory_only()).await;
    let from_disk: Option<String> = cache.load("k4", CacheStrategy::disk_only()).await;
    assert_eq!(from_memory.as_deref(), Some("both"));
    assert_eq!(from_disk.as_deref(), Some("both"));
  }

  #[tokio::test]
  async fn test_remove_is_total_across_tiers() {
    let dir = TempDir::new().unwrap();
    let cache = manager(&dir);

    cache.save("k5", &1u32, CacheStrategy::hybrid()).await;
    cache.remove("k5").await;

    for strategy in [
      CacheStrategy::memory_only(),
      CacheStrategy::disk_only(),
      CacheStrategy::hybrid(),
    ] {
      let loaded: Option<u32> = cache.load("k5", strategy).await;
      assert_eq!(loaded, None);
    }
  }

  #[tokio::test]
  async fn test_clear_empties_everything() {
    let dir = TempDir::new().unwrap();
    let cache = manager(&dir);

    cache.save("a", &1u32, CacheStrategy::hybrid()).await;
    cache.save("b", &2u32, CacheStrategy::disk_only()).await;

    cache.clear().await;
    assert!(!cache.is_clearing());

    let a: Option<u32> = cache.load("a", CacheStrategy::hybrid()).await;
    let b: Option<u32> = cache.load("b", CacheStrategy::disk_only()).await;
    assert_eq!(a, None);
    assert_eq!(b, None);
    assert_eq!(cache.total_size_bytes().await, 0);
  }

  #[tokio::test]
  async fn test_type_mismatch_is_a_miss_not_an_error() {
    let dir = TempDir::new().unwrap();
    let cache = manager(&dir);

    cache
      .save("k6", &"not a number", CacheStrategy::memory_only())
      .await;
    let loaded: Option<u64> = cache.load("k6", CacheStrategy::memory_only()).await;
    assert_eq!(loaded, None);
  }

  #[tokio::test]
  async fn test_default_expiration_applies_when_unset() {
    assert_eq!(CacheStrategy::hybrid().expiration(), DEFAULT_EXPIRATION);
    assert_eq!(
      CacheStrategy::hybrid()
        .with_expiration(Duration::from_secs(5))
        .expiration(),
      Duration::from_secs(5)
    );
  }
}
