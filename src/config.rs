//! Configuration file handling.
//!
//! This module provides loading and saving of apkscan configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/apkscan/config.toml`
//! - macOS: `~/Library/Application Support/apkscan/config.toml`
//! - Windows: `%APPDATA%\apkscan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! feed_url = "https://secdb.alpinelinux.org"
//! feed_repository = "main"
//! http_timeout_secs = 30
//! parallel_layers = true
//! default_format = "table"
//! log_level = "warn"
//! log_format = "text"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScanError};

/// Application configuration.
///
/// Every field has a default, so a partial file (or no file) is valid.
///
/// # Example
///
/// ```no_run
/// use apkscan::Config;
///
/// // Load from file (or use defaults if file doesn't exist)
/// let config = Config::load().unwrap();
///
/// println!("Feed: {}", config.feed_url);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Alpine security feed.
    ///
    /// Default: `https://secdb.alpinelinux.org`
    pub feed_url: String,

    /// Repository feed to match against (`main` or `community`).
    ///
    /// Default: "main"
    pub feed_repository: String,

    /// Timeout for the feed request, in seconds.
    ///
    /// Default: 30
    pub http_timeout_secs: u64,

    /// Whether layers are scanned concurrently.
    ///
    /// Default: true
    pub parallel_layers: bool,

    /// Default output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json"
    /// Default: "table"
    pub default_format: String,

    /// Log filter used when `RUST_LOG` is not set.
    ///
    /// Default: "warn"
    pub log_level: String,

    /// Log line format: "text" or "json".
    ///
    /// Default: "text"
    pub log_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: "https://secdb.alpinelinux.org".to_string(),
            feed_repository: "main".to_string(),
            http_timeout_secs: 30,
            parallel_layers: true,
            default_format: "table".to_string(),
            log_level: "warn".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Loads configuration from an explicit path, falling back to defaults
    /// when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| config_error(path, e))?;
        toml::from_str(&content).map_err(|e| config_error(path, e))
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| config_error(path, e))?;
            }
        }

        let content = toml::to_string_pretty(self).map_err(|e| config_error(path, e))?;
        fs::write(path, content).map_err(|e| config_error(path, e))
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("apkscan")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn config_error(path: &Path, err: impl std::fmt::Display) -> ScanError {
    ScanError::Config {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}
