//! Structured logging initialization.
//!
//! The router logs through `tracing` macros; this module installs a subscriber
//! for applications that do not bring their own. Output is JSON for production
//! and pretty-printed for development.
//!
//! ## Environment Variables
//!
//! - `SWITCHYARD_LOG_LEVEL`: trace/debug/info/warn/error (default `info`)
//! - `SWITCHYARD_LOG_FORMAT`: `json` (default) or `pretty`
//! - `SWITCHYARD_LOG_TARGET_FILTER`: extra comma-separated filter directives,
//!   e.g. `switchyard::router=debug`
//! - `SWITCHYARD_LOG_INCLUDE_LOCATION`: `true` to add file:line
//!
//! `RUST_LOG`, when set, replaces the level.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    /// Additional filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Read `SWITCHYARD_LOG_*`; unset or blank variables keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            log_level: non_empty("SWITCHYARD_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: non_empty("SWITCHYARD_LOG_FORMAT")
                .map_or(defaults.format, |f| LogFormat::parse(&f)),
            target_filter: non_empty("SWITCHYARD_LOG_TARGET_FILTER"),
            include_location: non_empty("SWITCHYARD_LOG_INCLUDE_LOCATION")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.include_location),
        }
    }

    /// Verbose, human-readable configuration for local runs and tests
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            target_filter: None,
            include_location: true,
        }
    }

    fn level(&self) -> Level {
        self.log_level.trim().parse().unwrap_or(Level::INFO)
    }

    fn target_directives(&self) -> Result<Vec<Directive>> {
        let Some(filter) = &self.target_filter else {
            return Ok(Vec::new());
        };
        filter
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| {
                d.parse::<Directive>()
                    .with_context(|| format!("Invalid log filter directive `{d}`"))
            })
            .collect()
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let base = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        Ok(self
            .target_directives()?
            .into_iter()
            .fold(base, EnvFilter::add_directive))
    }
}

/// Initialize logging from `SWITCHYARD_LOG_*` environment variables.
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LogConfig::from_env())
}

/// Install the global subscriber described by `config`.
///
/// Fails, rather than panicking, when a global subscriber is already set or a
/// target directive does not parse.
///
/// ```rust
/// use switchyard::logging::{init_logging_with_config, LogConfig};
///
/// let config = LogConfig::default_dev();
/// init_logging_with_config(&config).unwrap();
/// assert!(init_logging_with_config(&config).is_err());
/// ```
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let location = config.include_location;
    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_file(location)
            .with_line_number(location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(location)
            .with_line_number(location)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}
