//! Configuration management for redmine-mcp-tools.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. TOML config file (`~/.config/redmine-mcp-tools/config.toml` on Linux,
//!    the platform config directory elsewhere)
//! 3. Environment variables: `REDMINE_URL`, `REDMINE_API_KEY`, `BIND`, `PORT`
//!
//! Command-line flags are applied on top by the binary.
//!
//! # Example
//!
//! ```ignore
//! use redmine_core::Config;
//!
//! let mut config = Config::load()?.with_env();
//! config.set("redmine.url", "https://redmine.example.com")?;
//! config.save()?;
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "redmine-mcp-tools";

pub const ENV_REDMINE_URL: &str = "REDMINE_URL";
pub const ENV_REDMINE_API_KEY: &str = "REDMINE_API_KEY";
pub const ENV_BIND: &str = "BIND";
pub const ENV_PORT: &str = "PORT";

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Redmine connection
    #[serde(default)]
    pub redmine: RedmineConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Redmine connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedmineConfig {
    /// Redmine base URL
    #[serde(default = "default_redmine_url")]
    pub url: String,
    /// REST API access key
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
}

/// HTTP transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Vendor reported in `serverInfo`
    #[serde(default = "default_vendor")]
    pub vendor: String,
}

impl Default for RedmineConfig {
    fn default() -> Self {
        Self {
            url: default_redmine_url(),
            api_key: String::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            vendor: default_vendor(),
        }
    }
}

fn default_redmine_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_vendor() -> String {
    "Custom".to_string()
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default config if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_REDMINE_URL) {
            self.redmine.url = url;
        }
        if let Some(key) = lookup(ENV_REDMINE_API_KEY) {
            self.redmine.api_key = key;
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(port) = lookup(ENV_PORT) {
            match port.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid {} value", ENV_PORT),
            }
        }
        self
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `redmine.url`, `server.port`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = split_key(key)?;

        match (section, field) {
            ("redmine", "url") => self.redmine.url = value.trim_end_matches('/').to_string(),
            ("redmine", "api_key" | "key") => self.redmine.api_key = value.to_string(),
            ("server", "bind") => self.server.bind = value.to_string(),
            ("server", "port") => {
                self.server.port = value
                    .parse()
                    .map_err(|_| Error::Config(format!("Invalid port: {}", value)))?;
            }
            ("server", "vendor") => self.server.vendor = value.to_string(),
            ("redmine" | "server", _) => {
                return Err(Error::Config(format!(
                    "Unknown {} config field: {}",
                    section, field
                )))
            }
            _ => return Err(Error::Config(format!("Unknown config section: {}", section))),
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `redmine.url`, `server.port`)
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (section, field) = split_key(key)?;

        match (section, field) {
            ("redmine", "url") => Ok(Some(self.redmine.url.clone())),
            ("redmine", "api_key" | "key") => {
                Ok(Some(self.redmine.api_key.clone()).filter(|key| !key.is_empty()))
            }
            ("server", "bind") => Ok(Some(self.server.bind.clone())),
            ("server", "port") => Ok(Some(self.server.port.to_string())),
            ("server", "vendor") => Ok(Some(self.server.vendor.clone())),
            ("redmine" | "server", _) => Err(Error::Config(format!(
                "Unknown {} config field: {}",
                section, field
            ))),
            _ => Err(Error::Config(format!("Unknown config section: {}", section))),
        }
    }

    /// Whether an API key is configured.
    pub fn has_api_key(&self) -> bool {
        !self.redmine.api_key.is_empty()
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        [section, field] => Ok((*section, *field)),
        _ => Err(Error::Config(format!(
            "Invalid config key '{}'. Expected format: section.field",
            key
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================
