use chrono::FixedOffset;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::record::Topic;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub remote: RemoteConfig,
  /// Topic used when no `goal` preference has been written yet.
  #[serde(default)]
  pub default_topic: Topic,
  /// Reference zone for "today", as whole hours from UTC. The generation job
  /// writes one record per calendar day in this zone.
  #[serde(default)]
  pub utc_offset_hours: i8,
  /// Override for the shared cache directory (defaults to the platform data
  /// directory). The widget process must point at the same location.
  pub data_dir: Option<PathBuf>,
  /// How often the widget process polls the refresh epoch, in seconds.
  #[serde(default = "default_widget_refresh")]
  pub widget_refresh_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  /// Base URL of the quote record store.
  pub url: String,
  /// Request timeout for remote reads and writes.
  #[serde(default = "default_timeout")]
  pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
  10
}

fn default_widget_refresh() -> u64 {
  60
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./quotd.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/quotd/config.yaml
  /// 4. ~/.config/quotd/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/quotd/config.yaml\n\
                 with at least a remote.url entry."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("quotd.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("quotd").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Bearer token for the remote store, if the deployment requires one.
  /// Read from the environment, never from the config file.
  pub fn api_token() -> Option<String> {
    std::env::var("QUOTD_TOKEN").ok()
  }

  /// The reference zone as a fixed offset.
  pub fn reference_zone(&self) -> Result<FixedOffset> {
    FixedOffset::east_opt(i32::from(self.utc_offset_hours) * 3600)
      .ok_or_else(|| eyre!("utc_offset_hours {} is out of range", self.utc_offset_hours))
  }

  /// Path of the shared cache database both processes open.
  pub fn cache_db_path(&self) -> Result<PathBuf> {
    let dir = match &self.data_dir {
      Some(dir) => dir.clone(),
      None => dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
        .ok_or_else(|| eyre!("Could not determine data directory"))?
        .join("quotd"),
    };
    Ok(dir.join("cache.db"))
  }
}
