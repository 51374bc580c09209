//! Herald Logging Setup
//!
//! The bus emits `tracing` events; this crate installs a global subscriber
//! that renders them, configured through `HERALD_*` environment variables.
//!
//! # Usage
//!
//! ```rust
//! // Reads HERALD_LOG_LEVEL, HERALD_LOG_FORMAT, ... and installs a subscriber.
//! // Calling it again is a no-op that returns the first configuration.
//! let config = herald_log::init().unwrap();
//! assert_eq!(herald_log::config(), Some(config));
//! ```
//!
//! # Environment Variables
//!
//! - `HERALD_DEBUG=1` - Shortcut for `HERALD_LOG_LEVEL=debug`
//! - `HERALD_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `HERALD_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `HERALD_LOG_COLOR=1|0` - Enable/disable colors
//! - `HERALD_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `HERALD_LOG=<directives>` - Full `EnvFilter` directives, overrides the level

use once_cell::sync::OnceCell;
use std::env;
use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level rendered by the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Trace level (most verbose, includes per-callback timings)
    Trace,
    /// Debug level (registrations, subscriptions, publishes)
    Debug,
    Info,
    Warn,
    Error,
    /// Off (no logging)
    Off,
}

impl Level {
    /// Get level from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Spelling used in `EnvFilter` directives.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_directive().to_uppercase())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line, human oriented
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Format {
    /// Get format from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging errors
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Invalid log filter {directives:?}: {message}")]
    InvalidFilter { directives: String, message: String },

    #[error("Failed to install global subscriber: {0}")]
    Install(String),
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the event target (module path)
    pub target: bool,
    /// Raw `EnvFilter` directives; take precedence over `level`
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Compact,
            color: false,
            timestamps: true,
            target: true,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Same as [`LogConfig::from_env`] with a custom variable lookup.
    ///
    /// Unparseable values fall back to the defaults.
    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str| lookup(key).map(|v| v == "1" || v.to_lowercase() == "true");

        let debug = flag("HERALD_DEBUG").unwrap_or(false);

        let level = lookup("HERALD_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { defaults.level });

        let format = lookup("HERALD_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(defaults.format);

        let color = flag("HERALD_LOG_COLOR").unwrap_or_else(|| {
            lookup("NO_COLOR").is_none() && lookup("TERM").is_some() && format != Format::Json
        });

        Self {
            level,
            format,
            color,
            timestamps: flag("HERALD_LOG_TIMESTAMPS").unwrap_or(defaults.timestamps),
            target: defaults.target,
            filter: lookup("HERALD_LOG").filter(|s| !s.trim().is_empty()),
        }
    }

    /// Set the minimum level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Filter directives the subscriber is built with
    pub fn directives(&self) -> &str {
        self.filter
            .as_deref()
            .unwrap_or_else(|| self.level.as_directive())
    }

    /// Build the `EnvFilter` for this configuration
    pub fn env_filter(&self) -> Result<EnvFilter, LogError> {
        EnvFilter::try_new(self.directives()).map_err(|e| LogError::InvalidFilter {
            directives: self.directives().to_string(),
            message: e.to_string(),
        })
    }

    /// Formatting layer for this configuration
    pub fn fmt_layer<S>(&self) -> Box<dyn Layer<S> + Send + Sync + 'static>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let layer = fmt::layer()
            .with_ansi(self.color)
            .with_target(self.target);

        match (self.format, self.timestamps) {
            (Format::Pretty, true) => layer.pretty().boxed(),
            (Format::Pretty, false) => layer.pretty().without_time().boxed(),
            (Format::Compact, true) => layer.compact().boxed(),
            (Format::Compact, false) => layer.compact().without_time().boxed(),
            (Format::Json, true) => layer.json().boxed(),
            (Format::Json, false) => layer.json().without_time().boxed(),
        }
    }

    fn install(&self) -> Result<(), LogError> {
        tracing_subscriber::registry()
            .with(self.env_filter()?)
            .with(self.fmt_layer())
            .try_init()
            .map_err(|e| LogError::Install(e.to_string()))
    }
}

// ============================================================================
// Public API
// ============================================================================

static INSTALLED: OnceCell<LogConfig> = OnceCell::new();

/// Install the global subscriber from environment variables.
pub fn init() -> Result<&'static LogConfig, LogError> {
    init_with(LogConfig::from_env())
}

/// Install the global subscriber with an explicit configuration.
///
/// Only the first successful call installs anything; later calls return the
/// configuration that is in effect.
pub fn init_with(config: LogConfig) -> Result<&'static LogConfig, LogError> {
    INSTALLED.get_or_try_init(|| {
        config.install()?;
        Ok(config)
    })
}

/// Configuration installed by [`init`], if any
pub fn config() -> Option<&'static LogConfig> {
    INSTALLED.get()
}

// ============================================================================
// Tests
// ============================================================================
