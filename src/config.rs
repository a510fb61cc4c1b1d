use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HealthConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub retention: RetentionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// `"stdio"` or `"http"`.
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Retention windows enforced by the sweeper.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetentionConfig {
    /// Days a `recovered*` condition survives after its last update.
    pub recovered_grace_days: u64,
    /// Hours a food log entry survives after `taken_at`.
    pub food_window_hours: u64,
    /// Sweep before every tool call, not just at startup.
    pub purge_on_each_call: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 8765,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_healthdb_dir()
            .join("health.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            recovered_grace_days: 14,
            food_window_hours: 24,
            purge_on_each_call: true,
        }
    }
}

impl RetentionConfig {
    pub fn recovered_grace_secs(&self) -> i64 {
        (self.recovered_grace_days as i64).saturating_mul(24 * 3600)
    }

    pub fn food_window_secs(&self) -> i64 {
        (self.food_window_hours as i64).saturating_mul(3600)
    }
}

/// Returns `~/.healthdb/`, or `./.healthdb/` when no home directory is known.
pub fn default_healthdb_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".healthdb")
}

/// Returns the default config file path: `~/.healthdb/config.toml`
pub fn default_config_path() -> PathBuf {
    default_healthdb_dir().join("config.toml")
}

impl HealthConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            HealthConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (HEALTHDB_DB, HEALTHDB_LOG_LEVEL, HEALTHDB_TRANSPORT, HEALTHDB_PURGE_EACH_CALL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HEALTHDB_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("HEALTHDB_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("HEALTHDB_TRANSPORT") {
            self.server.transport = val;
        }
        if let Ok(val) = std::env::var("HEALTHDB_PURGE_EACH_CALL") {
            match parse_flag(&val) {
                Some(flag) => self.retention.purge_on_each_call = flag,
                None => tracing::warn!(value = %val, "ignoring unrecognized HEALTHDB_PURGE_EACH_CALL"),
            }
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
