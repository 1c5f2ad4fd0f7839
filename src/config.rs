//! # Router Configuration Module
//!
//! Settings shared by the route table and the dispatcher, loaded from
//! environment variables or a TOML file.
//!
//! ## Environment Variables
//!
//! ### `SWITCHYARD_ROOT_URL`
//!
//! Absolute URL the application is served under, e.g.
//! `http://localhost/router/Example`. Prepended to generated URLs; its path
//! component is stripped from incoming request paths.
//!
//! Default: empty
//!
//! ### `SWITCHYARD_ACTION_SEPARATOR`
//!
//! Separator between controller and action in handler strings such as
//! `HomeController:index`.
//!
//! Default: `:`
//!
//! ### `SWITCHYARD_CONTROLLER_NAMESPACE`
//!
//! Namespace prefixed to every controller identifier.
//!
//! ### `SWITCHYARD_CACHE_FILE`
//!
//! Location of the compiled route cache. Unset disables caching.
//!
//! ## Usage
//!
//! ```rust
//! use switchyard::config::RouterConfig;
//!
//! let config = RouterConfig::from_toml_str(r#"
//!     root_url = "http://localhost/app"
//!     action_separator = "@"
//! "#).unwrap();
//! assert_eq!(config.action_separator, "@");
//! assert!(config.cache_file.is_none());
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_ACTION_SEPARATOR: &str = ":";

/// Router configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// Absolute root URL of the application.
    pub root_url: String,
    /// Controller/action separator (default `:`).
    pub action_separator: String,
    /// Namespace prefixed to controller identifiers.
    pub controller_namespace: Option<String>,
    /// Route cache file; `None` disables caching.
    pub cache_file: Option<PathBuf>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            root_url: String::new(),
            action_separator: DEFAULT_ACTION_SEPARATOR.to_string(),
            controller_namespace: None,
            cache_file: None,
        }
    }
}

impl RouterConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            root_url: lookup("SWITCHYARD_ROOT_URL").unwrap_or_default(),
            action_separator: non_empty("SWITCHYARD_ACTION_SEPARATOR")
                .unwrap_or_else(|| DEFAULT_ACTION_SEPARATOR.to_string()),
            controller_namespace: non_empty("SWITCHYARD_CONTROLLER_NAMESPACE"),
            cache_file: non_empty("SWITCHYARD_CACHE_FILE").map(PathBuf::from),
        }
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source).context("Invalid router configuration")?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read router configuration {}", path.display()))?;
        Self::from_toml_str(&source)
            .with_context(|| format!("Failed to parse router configuration {}", path.display()))
    }
}
