use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::clock::Seconds;

const TOKEN_VAR: &str = "HARMONY_API_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub network: NetworkConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
  /// Prefix of every request path, e.g. `https://api.example.com/v1`
  pub base_url: String,
  /// Headers sent with every request
  #[serde(default)]
  pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds a cached response stays valid
  #[serde(default = "default_expire_in")]
  pub expire_in: Seconds,
  /// Serve stale responses when the network is unreachable
  #[serde(default = "default_offline_fallback")]
  pub offline_fallback: bool,
  /// Cache database location (defaults to the user data directory)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      expire_in: default_expire_in(),
      offline_fallback: default_offline_fallback(),
      path: None,
    }
  }
}

fn default_expire_in() -> Seconds {
  300
}

fn default_offline_fallback() -> bool {
  true
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./harmony.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/harmony/config.yaml
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
        "No configuration file found. Create one at ~/.config/harmony/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("harmony.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("harmony").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.cache.expire_in < 0 {
      return Err(eyre!("cache.expire_in must not be negative"));
    }
    Ok(config)
  }

  /// API token from `HARMONY_API_TOKEN`, if set.
  pub fn get_api_token() -> Option<String> {
    std::env::var(TOKEN_VAR).ok().filter(|t| !t.is_empty())
  }

  /// Configured headers, plus a bearer `Authorization` header for `token`
  /// unless the file already sets one.
  pub fn global_headers(&self, token: Option<&str>) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = self
      .network
      .headers
      .iter()
      .map(|(name, value)| (name.clone(), value.clone()))
      .collect();

    if let Some(token) = token {
      let configured = headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("authorization"));
      if !configured {
        headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
      }
    }

    headers
  }
}
