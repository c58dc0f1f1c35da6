//! On-disk cache tier: one file per key.
//!
//! File names are the SHA-256 hex digest of the cache key, so arbitrary
//! keys map to stable, filesystem-safe names. File contents are the JSON
//! entry envelope; the envelope's stored timestamp drives expiration. File
//! modification time is used only to order the size-budget sweep (oldest
//! deleted first), so an externally touched file can reorder deletions but
//! never resurrect an expired entry.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use super::entry::RawEntry;
use super::tier::CacheTier;
use crate::error::{Error, Result};

/// Default size budget for the cache directory.
pub const DEFAULT_DISK_BUDGET_BYTES: u64 = 100 * 1024 * 1024;

/// File-per-key disk tier.
///
/// There is no per-entry capacity eviction; [`cleanup`] removes expired
/// entries and, when the directory exceeds its budget, the oldest files by
/// modification time until the directory fits again.
///
/// [`cleanup`]: CacheTier::cleanup
#[derive(Debug, Clone)]
pub struct DiskTier {
  dir: PathBuf,
  budget_bytes: u64,
}

impl DiskTier {
  pub fn new(dir: PathBuf) -> Self {
    Self {
      dir,
      budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
    }
  }

  pub fn with_budget(mut self, bytes: u64) -> Self {
    self.budget_bytes = bytes;
    self
  }

  /// Default cache directory for the app.
  pub fn default_dir() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".cache")))
      .ok_or_else(|| Error::Storage("Could not determine cache directory".to_string()))?;

    Ok(cache_dir.join("blueboxy"))
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn path_for(&self, key: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let digest = hex::encode(hasher.finalize());
    self.dir.join(format!("{}.json", digest))
  }

  async fn read_entry(&self, path: &Path) -> Option<RawEntry> {
    let bytes = match fs::read(path).await {
      Ok(bytes) => bytes,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
      Err(e) => {
        warn!(path = %path.display(), error = %e, "Failed to read cache file");
        return None;
      }
    };

    match serde_json::from_slice::<RawEntry>(&bytes) {
      Ok(entry) => Some(entry),
      Err(e) => {
        // Undecodable files are garbage; drop them so they stop costing reads
        warn!(path = %path.display(), error = %e, "Corrupt cache file, removing");
        let _ = fs::remove_file(path).await;
        None
      }
    }
  }

  /// All cache files with their size and modification time.
  async fn list_files(&self) -> Result<Vec<(PathBuf, u64, SystemTime)>> {
    let mut files = Vec::new();

    let mut entries = match fs::read_dir(&self.dir).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
      Err(e) => return Err(e.into()),
    };

    while let Some(dirent) = entries.next_entry().await? {
      let path = dirent.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") {
        continue;
      }
      let meta = match dirent.metadata().await {
        Ok(meta) => meta,
        Err(_) => continue,
      };
      let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
      files.push((path, meta.len(), modified));
    }

    Ok(files)
  }
}

#[async_trait]
impl CacheTier for DiskTier {
  async fn save(&self, key: &str, entry: RawEntry) -> Result<()> {
    fs::create_dir_all(&self.dir)
      .await
      .map_err(|e| Error::Storage(format!("Failed to create cache directory: {}", e)))?;

    let path = self.path_for(key);
    let bytes = serde_json::to_vec(&entry)?;

    // Write atomically via temp file
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, &bytes).await?;
    fs::rename(&temp_path, &path).await?;

    debug!(key = %key, bytes = bytes.len(), "Saved entry to disk cache");
    Ok(())
  }

  async fn load(&self, key: &str) -> Result<Option<RawEntry>> {
    let path = self.path_for(key);

    let entry = match self.read_entry(&path).await {
      Some(entry) => entry,
      None => return Ok(None),
    };

    if entry.is_expired() {
      debug!(key = %key, "Disk cache entry expired, removing");
      let _ = fs::remove_file(&path).await;
      return Ok(None);
    }

    Ok(Some(entry))
  }

  async fn remove(&self, key: &str) -> Result<()> {
    let path = self.path_for(key);
    match fs::remove_file(&path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }

  async fn clear(&self) -> Result<()> {
    for (path, _, _) in self.list_files().await? {
      let _ = fs::remove_file(&path).await;
    }
    Ok(())
  }

  async fn is_expired(&self, key: &str) -> bool {
    let path = self.path_for(key);
    match self.read_entry(&path).await {
      Some(entry) => entry.is_expired(),
      None => true,
    }
  }

  async fn size_bytes(&self) -> u64 {
    match self.list_files().await {
      Ok(files) => files.iter().map(|(_, len, _)| len).sum(),
      Err(_) => 0,
    }
  }

  async fn cleanup(&self) -> Result<()> {
    // Drop expired entries first
    let mut removed = 0usize;
    for (path, _, _) in self.list_files().await? {
      if let Some(entry) = self.read_entry(&path).await {
        if entry.is_expired() {
          let _ = fs::remove_file(&path).await;
          removed += 1;
        }
      }
    }
    if removed > 0 {
      debug!(count = removed, "Removed expired disk cache entries");
    }

    // Then shrink under the size budget, oldest files first
    let mut files = self.list_files().await?;
    let mut total: u64 = files.iter().map(|(_, len, _)| len).sum();
    if total <= self.budget_bytes {
      return Ok(());
    }

    files.sort_by_key(|(_, _, modified)| *modified);
    for (path, len, _) in files {
      if total <= self.budget_bytes {
        break;
      }
      if fs::remove_file(&path).await.is_ok() {
        total = total.saturating_sub(len);
        debug!(path = %path.display(), "Removed old cache file over size budget");
      }
    }

    Ok(())
  }
}
