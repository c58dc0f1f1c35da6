//! General key-value persistence for non-secret app state.
//!
//! Holds the user profile JSON and small flags (e.g. whether onboarding
//! has been completed). Secrets never land here; they belong to the
//! [`SecureStore`](super::secure::SecureStore).

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};

/// Schema for the preferences table.
const PREFS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS prefs (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// String-keyed persistent store backed by SQLite.
pub struct PrefsStore {
  conn: Mutex<Connection>,
}

impl PrefsStore {
  /// Open or create the store at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Open or create the store at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Error::Storage(format!("Failed to create data directory: {}", e)))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| Error::Storage(format!("Failed to open prefs database at {}: {}", path.display(), e)))?;

    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;

    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| Error::Storage("Could not determine data directory".to_string()))?;

    Ok(data_dir.join("blueboxy").join("prefs.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute_batch(PREFS_SCHEMA)
      .map_err(|e| Error::Storage(format!("Failed to run prefs migrations: {}", e)))?;
    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))
  }

  /// Fetch a value.
  pub fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.lock()?;
    let value = conn
      .query_row("SELECT value FROM prefs WHERE key = ?", params![key], |row| {
        row.get(0)
      })
      .optional()?;
    Ok(value)
  }

  /// Insert or overwrite a value.
  pub fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self.lock()?;
    conn.execute(
      "INSERT OR REPLACE INTO prefs (key, value, updated_at) VALUES (?, ?, datetime('now'))",
      params![key, value],
    )?;
    Ok(())
  }

  /// Delete a value. Deleting an absent key is not an error.
  pub fn delete(&self, key: &str) -> Result<()> {
    let conn = self.lock()?;
    conn.execute("DELETE FROM prefs WHERE key = ?", params![key])?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn store(dir: &TempDir) -> PrefsStore {
    PrefsStore::open(&dir.path().join("prefs.db")).unwrap()
  }

  #[test]
  fn test_set_get_delete() {
    let dir = TempDir::new().unwrap();
    let prefs = store(&dir);

    assert_eq!(prefs.get("onboarding_complete").unwrap(), None);

    prefs.set("onboarding_complete", "true").unwrap();
    assert_eq!(
      prefs.get("onboarding_complete").unwrap().as_deref(),
      Some("true")
    );

    prefs.set("onboarding_complete", "false").unwrap();
    assert_eq!(
      prefs.get("onboarding_complete").unwrap().as_deref(),
      Some("false")
    );

    prefs.delete("onboarding_complete").unwrap();
    assert_eq!(prefs.get("onboarding_complete").unwrap(), None);
  }

  #[test]
  fn test_values_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("prefs.db");

    {
      let prefs = PrefsStore::open(&path).unwrap();
      prefs.set("current_user", r#"{"id":1}"#).unwrap();
    }

    let prefs = PrefsStore::open(&path).unwrap();
    assert_eq!(
      prefs.get("current_user").unwrap().as_deref(),
      Some(r#"{"id":1}"#)
    );
  }
}
