//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured filter.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

pub type InitError = Box<dyn std::error::Error + Send + Sync>;

pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

/// Install the global subscriber; fails if one is already installed
pub fn init_tracing(config: &LoggingConfig) -> Result<(), InitError> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(config));

    match config.format {
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
        LogFormat::Pretty => builder.with_target(true).try_init(),
    }
}
