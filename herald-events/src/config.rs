//! Bus configuration
//!
//! A [`BusConfig`] is handed to the bus at construction time. It can be
//! built in code, parsed from TOML or read from `HERALD_BUS_*`
//! environment variables.

use crate::name::NameStrategy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: String, value: String },
}

/// Event bus configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Emit `tracing` events for bus activity
    pub enable_logging: bool,

    /// How structured events derive their names by default
    pub name_strategy: NameStrategy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            name_strategy: NameStrategy::DEFAULT,
        }
    }
}

impl BusConfig {
    /// Parse a TOML document; missing keys fall back to defaults.
    ///
    /// ```
    /// use herald_events::BusConfig;
    ///
    /// let config = BusConfig::from_toml_str("enable_logging = false").unwrap();
    /// assert!(!config.enable_logging);
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))
    }

    /// Read `HERALD_BUS_LOGGING` and `HERALD_BUS_NAME_STRATEGY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Same as [`BusConfig::from_env`] with a custom variable lookup.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("HERALD_BUS_LOGGING") {
            config.enable_logging = parse_bool(&value).ok_or_else(|| ConfigError::Invalid {
                key: "HERALD_BUS_LOGGING".to_string(),
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup("HERALD_BUS_NAME_STRATEGY") {
            config.name_strategy =
                NameStrategy::parse(&value).ok_or_else(|| ConfigError::Invalid {
                    key: "HERALD_BUS_NAME_STRATEGY".to_string(),
                    value: value.clone(),
                })?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
