use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::gpg::KeyServerInformation;
use crate::http::HttpOptions;

/// HTTP client parameters (optional `[http]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Connect timeout per request, in seconds.
    pub connect_timeout_secs: u64,
    /// Upper bound for a single request (artifact or key lookup), in seconds.
    pub timeout_secs: u64,
    /// Deadline for the whole key-server walk, in seconds.
    pub key_lookup_timeout_secs: u64,
    /// Overrides the default `dlv/<version>` user agent.
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            timeout_secs: 300,
            key_lookup_timeout_secs: 60,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    pub fn to_options(&self) -> HttpOptions {
        let defaults = HttpOptions::default();
        HttpOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            ..defaults
        }
    }

    pub fn key_lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.key_lookup_timeout_secs)
    }
}

/// Global configuration loaded from `~/.config/dlv/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DlvConfig {
    /// Key servers and protocols; built-in defaults when missing.
    #[serde(default)]
    pub keyservers: KeyServerInformation,
    #[serde(default)]
    pub http: HttpConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dlv")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DlvConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DlvConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DlvConfig = toml::from_str(&data)?;
    Ok(cfg)
}
