use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::cache::{DEFAULT_MEMORY_CAPACITY, DEFAULT_SIZE_BUDGET_BYTES};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  #[serde(default)]
  pub cache: CacheSettings,
  #[serde(default)]
  pub session: SessionSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  /// Base URL of the BlueBoxy backend
  pub url: String,
  /// Path of the token-refresh endpoint
  #[serde(default = "default_refresh_path")]
  pub refresh_path: String,
}

impl BackendConfig {
  /// Full URL of the token-refresh endpoint.
  pub fn refresh_endpoint(&self) -> Result<Url> {
    let base = Url::parse(&self.url)
      .map_err(|e| Error::Config(format!("Invalid backend URL {}: {}", self.url, e)))?;
    base
      .join(&self.refresh_path)
      .map_err(|e| Error::Config(format!("Invalid refresh path {}: {}", self.refresh_path, e)))
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
  /// Maximum number of in-memory entries
  #[serde(default = "default_memory_capacity")]
  pub memory_capacity: usize,
  /// Total size budget in bytes before cleanup runs
  #[serde(default = "default_size_budget")]
  pub size_budget_bytes: u64,
  /// Cache directory (defaults to the platform cache dir)
  pub directory: Option<PathBuf>,
}

impl Default for CacheSettings {
  fn default() -> Self {
    Self {
      memory_capacity: default_memory_capacity(),
      size_budget_bytes: default_size_budget(),
      directory: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
  /// Seconds between background session validity checks
  #[serde(default = "default_monitor_interval")]
  pub monitor_interval_secs: u64,
}

impl Default for SessionSettings {
  fn default() -> Self {
    Self {
      monitor_interval_secs: default_monitor_interval(),
    }
  }
}

fn default_refresh_path() -> String {
  "/api/auth/refresh".to_string()
}

fn default_memory_capacity() -> usize {
  DEFAULT_MEMORY_CAPACITY
}

fn default_size_budget() -> u64 {
  DEFAULT_SIZE_BUDGET_BYTES
}

fn default_monitor_interval() -> u64 {
  60
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./blueboxy.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/blueboxy/config.yaml
  /// 4. ~/.config/blueboxy/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(Error::Config(format!("Config file not found: {}", p.display())));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(Error::Config(
        "No configuration file found. Create one at ~/.config/blueboxy/config.yaml".to_string(),
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("blueboxy.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("blueboxy").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| Error::Config(format!("Failed to parse config file {}: {}", path.display(), e)))?;

    Ok(config)
  }
}
