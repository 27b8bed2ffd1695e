//! Configuration management
//!
//! Handles:
//! - Miner connection settings (host, port, Digest credentials, timeout)
//! - Status report thresholds
//! - `.env` / environment overrides
//!
//! Lookup order, lowest priority first: built-in defaults, TOML file,
//! environment (`ANTMINER_*`), command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub miner: MinerConfig,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing)] // Never write the password back out
    pub password: String,
    pub timeout_secs: u64,
}

/// Color band boundaries used by the status report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub fan_nominal_rpm: i64,
    pub fan_caution_rpm: i64,
    pub efficiency_good_pct: f64,
    pub efficiency_fair_pct: f64,
    pub temp_warn_celsius: i64,
    pub temp_crit_celsius: i64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.110".to_string(),
            port: 80,
            username: "root".to_string(),
            password: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            fan_nominal_rpm: 4000,
            fan_caution_rpm: 3000,
            efficiency_good_pct: 98.0,
            efficiency_fair_pct: 95.0,
            temp_warn_celsius: 75,
            temp_crit_celsius: 85,
        }
    }
}

impl MinerConfig {
    /// Connection settings taken straight from positional arguments
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Never zero, which would fail every request
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// `http://{host}:{port}/cgi-bin/stats.cgi`
    pub fn stats_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, crate::client::STATS_PATH)
    }

    /// Applies `ANTMINER_*` variables through `lookup` (normally `std::env::var`)
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ANTMINER_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("ANTMINER_PORT") {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(e) => warn!("Ignoring ANTMINER_PORT={}: {}", port, e),
            }
        }
        if let Some(username) = lookup("ANTMINER_USERNAME") {
            self.username = username;
        }
        if let Some(password) = lookup("ANTMINER_PASSWORD") {
            self.password = password;
        }
        if let Some(timeout) = lookup("ANTMINER_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => self.timeout_secs = secs,
                Err(e) => warn!("Ignoring ANTMINER_TIMEOUT_SECS={}: {}", timeout, e),
            }
        }
    }
}

impl AgentConfig {
    /// Loads config from `path`, or the OS-specific location when `None`.
    /// A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_file_path()?,
        };

        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: AgentConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads config then applies `.env` and process environment overrides
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok(); // Fine if .env doesn't exist
        let mut config = Self::load(path)?;
        config.miner.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Get OS-specific config file path
    pub fn config_file_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;

        path.push("antminer-agent");
        path.push("config.toml");
        Ok(path)
    }
}
