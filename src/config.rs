//! Server configuration loaded from TOML.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::odds::OddsConfig;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "CASE_SERVER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "server.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    /// Case openings per IP per window
    pub open_requests: u32,
    /// Deposits per IP per window
    pub deposit_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            open_requests: 120,
            deposit_requests: 10,
        }
    }
}

/// Background pruning of in-memory state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub interval_secs: u64,
    /// How long completed and cancelled battles stay listed
    pub battle_retention_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            battle_retention_secs: 3_600,
        }
    }
}

impl MaintenanceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn battle_retention(&self) -> Duration {
        Duration::from_secs(self.battle_retention_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub database_url: String,
    /// Hex HMAC key for receipts; random per process when absent
    pub receipt_key: Option<String>,
    pub odds: OddsConfig,
    pub rate_limit: RateLimitConfig,
    pub maintenance: MaintenanceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 2567,
            data_dir: PathBuf::from("data"),
            database_url: "sqlite:cases.db?mode=rwc".to_string(),
            receipt_key: None,
            odds: OddsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from `$CASE_SERVER_CONFIG`, falling back to `server.toml`.
    /// A missing file gives defaults; an unreadable or invalid one is an error.
    pub fn load() -> Result<Self, String> {
        let path = std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(Path::new(&path))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            warn!("Config file {:?} not found, using defaults", path);
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
        let config = Self::from_toml_str(&content).map_err(|e| format!("{:?}: {}", path, e))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.odds.validate()?;
        if self.rate_limit.window_secs == 0 {
            return Err("rate_limit.window_secs must be positive".to_string());
        }
        if self.maintenance.interval_secs == 0 {
            return Err("maintenance.interval_secs must be positive".to_string());
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| format!("Invalid bind address '{}': {}", self.bind_address, e))
    }
}
