//! Platform secure storage for small secrets.
//!
//! Only three accounts ever live here: the auth token, the refresh token,
//! and the user id. Keyring calls are effectively synchronous; they run on
//! the blocking pool so the call sites stay uniformly async.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};

/// Keychain-equivalent store for small secrets.
///
/// An empty string is never a present credential: implementations report
/// empty values as absent on load and refuse to store them.
#[async_trait]
pub trait SecureStore: Send + Sync {
  /// Store a secret under `account`. Storing an empty secret deletes the
  /// entry instead.
  async fn save(&self, account: &str, secret: &str) -> Result<()>;

  /// Fetch a secret. Absent and empty both read as `None`.
  async fn load(&self, account: &str) -> Result<Option<String>>;

  /// Delete a secret. Deleting an absent entry is not an error.
  async fn delete(&self, account: &str) -> Result<()>;
}

/// Secure store backed by the OS keyring (macOS Keychain, Linux
/// secret-service, Windows Credential Manager).
pub struct KeyringStore {
  service: String,
}

impl KeyringStore {
  pub fn new(service: &str) -> Self {
    Self {
      service: service.to_string(),
    }
  }
}

#[async_trait]
impl SecureStore for KeyringStore {
  async fn save(&self, account: &str, secret: &str) -> Result<()> {
    if secret.is_empty() {
      return self.delete(account).await;
    }

    let service = self.service.clone();
    let account = account.to_string();
    let secret = secret.to_string();

    tokio::task::spawn_blocking(move || {
      let entry = keyring::Entry::new(&service, &account)
        .map_err(|e| Error::Storage(format!("Keyring error: {}", e)))?;
      entry
        .set_password(&secret)
        .map_err(|e| Error::Storage(format!("Failed to store secret: {}", e)))
    })
    .await
    .map_err(|e| Error::Storage(format!("Keyring task failed: {}", e)))?
  }

  async fn load(&self, account: &str) -> Result<Option<String>> {
    let service = self.service.clone();
    let account = account.to_string();

    tokio::task::spawn_blocking(move || {
      let entry = keyring::Entry::new(&service, &account)
        .map_err(|e| Error::Storage(format!("Keyring error: {}", e)))?;
      match entry.get_password() {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(Error::Storage(format!("Failed to read secret: {}", e))),
      }
    })
    .await
    .map_err(|e| Error::Storage(format!("Keyring task failed: {}", e)))?
  }

  async fn delete(&self, account: &str) -> Result<()> {
    let service = self.service.clone();
    let account = account.to_string();

    tokio::task::spawn_blocking(move || {
      let entry = keyring::Entry::new(&service, &account)
        .map_err(|e| Error::Storage(format!("Keyring error: {}", e)))?;
      match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(Error::Storage(format!("Failed to delete secret: {}", e))),
      }
    })
    .await
    .map_err(|e| Error::Storage(format!("Keyring task failed: {}", e)))?
  }
}

/// In-memory secure store for tests and environments without a keyring.
#[derive(Default)]
pub struct MemorySecureStore {
  secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecureStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
  async fn save(&self, account: &str, secret: &str) -> Result<()> {
    let mut secrets = self.secrets.write().await;
    if secret.is_empty() {
      secrets.remove(account);
    } else {
      secrets.insert(account.to_string(), secret.to_string());
    }
    debug!(account = %account, "Stored secret");
    Ok(())
  }

  async fn load(&self, account: &str) -> Result<Option<String>> {
    let secrets = self.secrets.read().await;
    Ok(secrets.get(account).filter(|v| !v.is_empty()).cloned())
  }

  async fn delete(&self, account: &str) -> Result<()> {
    self.secrets.write().await.remove(account);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_memory_store_round_trip() {
    let store = MemorySecureStore::new();

    store.save("auth_token", "t1").await.unwrap();
    assert_eq!(store.load("auth_token").await.unwrap().as_deref(), Some("t1"));

    store.delete("auth_token").await.unwrap();
    assert_eq!(store.load("auth_token").await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_empty_secret_reads_back_as_absent() {
    let store = MemorySecureStore::new();

    store.save("auth_token", "t1").await.unwrap();
    store.save("auth_token", "").await.unwrap();

    assert_eq!(store.load("auth_token").await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_delete_absent_is_ok() {
    let store = MemorySecureStore::new();
    store.delete("never_stored").await.unwrap();
  }
}
