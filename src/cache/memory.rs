//! In-process cache tier with recency-based eviction.

use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::entry::RawEntry;
use super::tier::CacheTier;
use crate::error::Result;

/// Default maximum number of entries before eviction kicks in.
pub const DEFAULT_CAPACITY: usize = 100;

/// Fraction of capacity evicted in one pass when the tier overflows.
const EVICTION_DIVISOR: usize = 5;

struct Stored {
  entry: RawEntry,
  size: usize,
}

struct MemoryInner {
  entries: LruCache<String, Stored>,
  bytes: u64,
}

/// Capacity-bounded in-memory tier.
///
/// All operations serialize behind a single lock; concurrent callers from
/// independent tasks cannot tear the map. When the entry count exceeds
/// capacity, the least-recently-used fifth of capacity is evicted in one
/// batch. Expired entries are evicted lazily on read and by [`cleanup`].
///
/// [`cleanup`]: CacheTier::cleanup
pub struct MemoryTier {
  inner: Arc<RwLock<MemoryInner>>,
  capacity: usize,
}

impl MemoryTier {
  pub fn new(capacity: usize) -> Self {
    let inner = MemoryInner {
      // Unbounded: batch eviction below, not the cache's one-at-a-time
      entries: LruCache::unbounded(),
      bytes: 0,
    };
    Self {
      inner: Arc::new(RwLock::new(inner)),
      capacity: capacity.max(1),
    }
  }

  /// Number of live entries.
  pub async fn len(&self) -> usize {
    self.inner.read().await.entries.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.inner.read().await.entries.is_empty()
  }

  fn evict_overflow(&self, inner: &mut MemoryInner) {
    if inner.entries.len() <= self.capacity {
      return;
    }

    let batch = (self.capacity / EVICTION_DIVISOR).max(1);
    for _ in 0..batch {
      match inner.entries.pop_lru() {
        Some((key, stored)) => {
          inner.bytes = inner.bytes.saturating_sub(stored.size as u64);
          debug!(key = %key, "Evicting least recently used cache entry");
        }
        None => break,
      }
    }
  }
}

#[async_trait]
impl CacheTier for MemoryTier {
  async fn save(&self, key: &str, entry: RawEntry) -> Result<()> {
    let size = entry.estimated_size() + key.len();
    let mut inner = self.inner.write().await;

    if let Some(old) = inner.entries.put(key.to_string(), Stored { entry, size }) {
      inner.bytes = inner.bytes.saturating_sub(old.size as u64);
    }
    inner.bytes += size as u64;

    self.evict_overflow(&mut inner);

    trace!(key = %key, entries = inner.entries.len(), "Saved entry to memory cache");
    Ok(())
  }

  async fn load(&self, key: &str) -> Result<Option<RawEntry>> {
    let mut inner = self.inner.write().await;

    let expired = match inner.entries.get(key) {
      None => return Ok(None),
      Some(stored) => stored.entry.is_expired(),
    };

    if expired {
      if let Some(stored) = inner.entries.pop(key) {
        inner.bytes = inner.bytes.saturating_sub(stored.size as u64);
      }
      debug!(key = %key, "Memory cache entry expired, evicting");
      return Ok(None);
    }

    // The `get` above already refreshed recency
    Ok(inner.entries.peek(key).map(|s| s.entry.clone()))
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let mut inner = self.inner.write().await;
    if let Some(stored) = inner.entries.pop(key) {
      inner.bytes = inner.bytes.saturating_sub(stored.size as u64);
    }
    Ok(())
  }

  async fn clear(&self) -> Result<()> {
    let mut inner = self.inner.write().await;
    inner.entries.clear();
    inner.bytes = 0;
    Ok(())
  }

  async fn is_expired(&self, key: &str) -> bool {
    let inner = self.inner.read().await;
    match inner.entries.peek(key) {
      Some(stored) => stored.entry.is_expired(),
      // No entry means nothing valid to serve
      None => true,
    }
  }

  async fn size_bytes(&self) -> u64 {
    self.inner.read().await.bytes
  }

  async fn cleanup(&self) -> Result<()> {
    let mut inner = self.inner.write().await;

    let expired: Vec<String> = inner
      .entries
      .iter()
      .filter(|(_, stored)| stored.entry.is_expired())
      .map(|(key, _)| key.clone())
      .collect();

    let count = expired.len();
    for key in expired {
      if let Some(stored) = inner.entries.pop(&key) {
        inner.bytes = inner.bytes.saturating_sub(stored.size as u64);
      }
    }

    if count > 0 {
      debug!(count = count, "Cleaned up expired memory cache entries");
    }
    Ok(())
  }
}

impl Clone for MemoryTier {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
      capacity: self.capacity,
    }
  }
}
