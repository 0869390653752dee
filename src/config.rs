//! Server configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables:
//!
//! - `INTERACTIONS_CONFIG`: Path to the TOML file (optional)
//! - `INTERACTIONS_BIND_ADDR`: HTTP listen address (default: 0.0.0.0:8080)
//! - `INTERACTIONS_LOG_FORMAT`: `pretty` or `json` (default: pretty)
//! - `INTERACTIONS_LOG_FILTER`: Default tracing filter (default: info); `RUST_LOG` wins
//! - `INTERACTIONS_SWEEP_INTERVAL_SECS`: Retention sweep period (default: 60)
//! - `INTERACTIONS_MAX_POINTS`: Bucket cap per series in one read (default: 10000)

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::interaction::{InMemoryAppRegistry, RegistryError, SentryApp, DELIMITER};
use crate::tsdb::{Rollup, DEFAULT_MAX_POINTS};

pub const CONFIG_PATH_ENV: &str = "INTERACTIONS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub tsdb: TsdbConfig,
    pub apps: Vec<AppConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TsdbConfig {
    pub sweep_interval_secs: u64,
    pub max_points: u64,
    pub rollups: Vec<Rollup>,
}

impl Default for TsdbConfig {
    fn default() -> Self {
        TsdbConfig {
            sweep_interval_secs: 60,
            max_points: DEFAULT_MAX_POINTS,
            rollups: Rollup::defaults(),
        }
    }
}

impl TsdbConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// An integration app and the component types it registered
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub id: u64,
    pub slug: String,
    pub owner_id: u64,
    #[serde(default)]
    pub components: Vec<String>,
}

impl Config {
    /// File from `INTERACTIONS_CONFIG` (if set), then environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Config::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("INTERACTIONS_BIND_ADDR") {
            self.server.bind_addr = value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "INTERACTIONS_BIND_ADDR",
                value,
            })?;
        }

        if let Some(value) = lookup("INTERACTIONS_LOG_FORMAT") {
            self.logging.format = match value.to_ascii_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "INTERACTIONS_LOG_FORMAT",
                        value,
                    })
                }
            };
        }

        if let Some(value) = lookup("INTERACTIONS_LOG_FILTER") {
            self.logging.filter = value;
        }

        if let Some(value) = lookup("INTERACTIONS_SWEEP_INTERVAL_SECS") {
            self.tsdb.sweep_interval_secs = value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "INTERACTIONS_SWEEP_INTERVAL_SECS",
                value,
            })?;
        }

        if let Some(value) = lookup("INTERACTIONS_MAX_POINTS") {
            self.tsdb.max_points = value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "INTERACTIONS_MAX_POINTS",
                value,
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tsdb.rollups.is_empty() {
            return Err(ConfigError::Invalid("at least one rollup is required".to_string()));
        }
        if self
            .tsdb
            .rollups
            .iter()
            .any(|rollup| rollup.resolution_secs == 0 || rollup.samples == 0)
        {
            return Err(ConfigError::Invalid(
                "rollup resolution and samples must be non-zero".to_string(),
            ));
        }
        if self
            .tsdb
            .rollups
            .windows(2)
            .any(|pair| pair[0].resolution_secs >= pair[1].resolution_secs)
        {
            return Err(ConfigError::Invalid(
                "rollups must be listed finest first with distinct resolutions".to_string(),
            ));
        }
        if self.tsdb.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid("sweep_interval_secs must be non-zero".to_string()));
        }
        if self.tsdb.max_points == 0 {
            return Err(ConfigError::Invalid("max_points must be non-zero".to_string()));
        }

        for app in &self.apps {
            if app.slug.is_empty() || app.slug.contains(DELIMITER) {
                return Err(ConfigError::Invalid(format!(
                    "app slug '{}' must be non-empty and must not contain '{}'",
                    app.slug, DELIMITER
                )));
            }
        }

        Ok(())
    }

    /// Registry seeded with the configured apps
    pub fn build_registry(&self) -> Result<InMemoryAppRegistry, ConfigError> {
        let registry = InMemoryAppRegistry::new();
        for app in &self.apps {
            registry.register_app(SentryApp {
                id: app.id,
                slug: app.slug.clone(),
                owner_id: app.owner_id,
            })?;
            for component_type in &app.components {
                registry.register_component(app.id, component_type)?;
            }
        }
        Ok(registry)
    }
}
