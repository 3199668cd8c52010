//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! faction-poll service, including TOML file and environment variable
//! loading and validation.

use crate::catalog::{FactionCatalog, DEFAULT_FACTIONS};
use crate::types::DEFAULT_HISTORY_LIMIT;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub storage: StorageSettings,
    pub catalog: CatalogSettings,
}

/// Service-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Host the HTTP server binds to
    pub http_host: String,
    /// Port for the HTTP API, health and metrics endpoints
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Rating file settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path of the JSON rating document
    pub data_file: PathBuf,
    /// History entries kept per user
    pub history_limit: usize,
    /// Write through a temporary file and rename
    pub atomic_writes: bool,
}

/// Faction catalog settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Faction names in display order
    pub factions: Vec<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "faction-poll".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("arknights_scores.json"),
            history_limit: DEFAULT_HISTORY_LIMIT,
            atomic_writes: true,
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            factions: DEFAULT_FACTIONS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still
    /// override individual values
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            self.service.http_host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            self.service.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Storage settings
        if let Ok(data_file) = env::var("DATA_FILE") {
            self.storage.data_file = PathBuf::from(data_file);
        }
        if let Ok(limit) = env::var("HISTORY_LIMIT") {
            self.storage.history_limit = limit
                .parse()
                .map_err(|_| anyhow!("Invalid HISTORY_LIMIT value: {}", limit))?;
        }
        if let Ok(atomic) = env::var("ATOMIC_WRITES") {
            self.storage.atomic_writes = atomic
                .parse()
                .map_err(|_| anyhow!("Invalid ATOMIC_WRITES value: {}", atomic))?;
        }

        // Catalog
        if let Ok(factions) = env::var("FACTIONS") {
            self.catalog.factions = parse_faction_list(&factions);
        }

        Ok(())
    }

    /// Build the faction catalog described by this configuration
    pub fn faction_catalog(&self) -> Result<FactionCatalog> {
        FactionCatalog::new(self.catalog.factions.iter().cloned())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Split a comma-separated faction list, dropping surrounding whitespace
pub fn parse_faction_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate storage settings
    if config.storage.data_file.as_os_str().is_empty() {
        return Err(anyhow!("Data file path cannot be empty"));
    }
    if config.storage.history_limit == 0 {
        return Err(anyhow!("History limit must be greater than 0"));
    }

    // Validate catalog
    config
        .faction_catalog()
        .context("Invalid faction catalog")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.storage.history_limit, 10);
        assert_eq!(config.faction_catalog().unwrap().len(), 51);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.service.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.service.http_port = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.storage.history_limit = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.catalog.factions = vec![];
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.catalog.factions = vec!["A".to_string(), "A".to_string()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_parse_faction_list() {
        assert_eq!(
            parse_faction_list(" 归元, 节制 ,,巅峰"),
            vec!["归元".to_string(), "节制".to_string(), "巅峰".to_string()]
        );
    }

    #[test]
    fn test_from_file_partial_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poll.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[service]
http_port = 9191

[storage]
data_file = "/var/lib/poll/scores.json"
history_limit = 5

[catalog]
factions = ["A", "B"]
"#
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.service.http_port, 9191);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.storage.history_limit, 5);
        assert!(config.storage.atomic_writes);
        assert_eq!(config.faction_catalog().unwrap().len(), 2);
    }

    #[test]
    fn test_from_file_missing() {
        assert!(AppConfig::from_file("/definitely/not/here.toml").is_err());
    }
}
