//! TOML-based application configuration.
//!
//! Stores backend defaults:
//! - Default timezone for users without a preference
//! - Pagination limits for entry listings
//!
//! Configuration is stored at `~/.config/journiv/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_page_limit() -> u32 {
    50
}

fn default_max_page_limit() -> u32 {
    100
}

/// Pagination configuration for entry listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Limit applied when the caller passes zero.
    #[serde(default = "default_page_limit")]
    pub default_limit: u32,
    /// Hard cap on any requested limit.
    #[serde(default = "default_max_page_limit")]
    pub max_limit: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_page_limit(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/journiv/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fallback timezone when neither the entry nor the user supplies one.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            pagination: PaginationConfig::default(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.default_timezone, "UTC");
        assert_eq!(cfg.pagination.default_limit, 50);
        assert_eq!(cfg.pagination.max_limit, 100);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: Config = toml::from_str("default_timezone = \"Asia/Tokyo\"").unwrap();
        assert_eq!(cfg.default_timezone, "Asia/Tokyo");
        assert_eq!(cfg.pagination.max_limit, 100);
    }

    #[test]
    fn roundtrips_through_toml() {
        let cfg = Config::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.default_timezone, cfg.default_timezone);
        assert_eq!(parsed.pagination.default_limit, cfg.pagination.default_limit);
    }
}
