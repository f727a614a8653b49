//! Configuration loading
//!
//! Resolution order for every setting:
//! 1. Command-line argument / environment variable (highest priority, see [`ConfigOverrides`])
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! A missing config file is not an error: the service logs a warning and
//! starts with defaults. A config file that exists but does not parse is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "DEALHUB_CONFIG";

/// Redis URL value selecting the in-process cache instead of Redis
pub const MEMORY_CACHE_URL: &str = "memory";

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DealhubConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cron: CronConfig,
    pub admin: AdminConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
        }
    }
}

/// Price refresh job settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CronConfig {
    /// Bearer secret for the cron endpoint; `None` rejects every call
    pub secret: Option<String>,
    /// In-process schedule; 0 disables it
    pub interval_minutes: u64,
    /// Maximum number of products refreshed concurrently
    pub refresh_concurrency: usize,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            secret: None,
            interval_minutes: 0,
            refresh_concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdminConfig {
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_path: Option<PathBuf>,
    pub redis_url: Option<String>,
    pub cron_secret: Option<String>,
    pub cron_interval_minutes: Option<u64>,
    pub admin_secret: Option<String>,
    pub log_level: Option<String>,
}

impl DealhubConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load configuration from a TOML file, falling back to defaults if it is missing
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve and load the configuration, then apply overrides
    pub fn load(cli_config_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match resolve_config_path(cli_config_path) {
            Some(path) => Self::load_file(&path)?,
            None => {
                warn!("No config file location available, using defaults");
                Self::default()
            }
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line / environment overrides on top of file values
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(path) = overrides.database_path {
            self.database.path = path;
        }
        if let Some(url) = overrides.redis_url {
            self.redis.url = url;
        }
        if let Some(secret) = overrides.cron_secret {
            self.cron.secret = Some(secret);
        }
        if let Some(minutes) = overrides.cron_interval_minutes {
            self.cron.interval_minutes = minutes;
        }
        if let Some(secret) = overrides.admin_secret {
            self.admin.secret = Some(secret);
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.cron.refresh_concurrency == 0 {
            return Err(Error::Config(
                "cron.refresh_concurrency must be at least 1".to_string(),
            ));
        }
        if self.cron.secret.as_deref() == Some("") {
            return Err(Error::Config("cron.secret must not be empty".to_string()));
        }
        if self.admin.secret.as_deref() == Some("") {
            return Err(Error::Config("admin.secret must not be empty".to_string()));
        }
        Ok(())
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Whether the in-process cache was requested instead of Redis
    pub fn uses_memory_cache(&self) -> bool {
        self.redis.url == MEMORY_CACHE_URL
    }
}

/// Determine which config file to read
///
/// Priority: explicit path, then `DEALHUB_CONFIG`, then the per-user config directory.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("dealhub").join("config.toml"))
}

/// Get OS-dependent default database path
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("dealhub"))
        .unwrap_or_else(|| PathBuf::from("./dealhub_data"))
        .join("dealhub.db")
}
