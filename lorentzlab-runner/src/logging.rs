//! Tracing subscriber setup for applications embedding the engine.
//!
//! Library code only emits `tracing` events; nothing here runs unless the
//! embedding binary or test asks for it.

use crate::config::{ConfigError, LogFormat, LoggingConfig};

/// Environment variable that overrides the configured filter.
pub const LOG_ENV_VAR: &str = "LORENTZLAB_LOG";

/// Install a global `fmt` subscriber.
///
/// `LORENTZLAB_LOG`, when set, takes precedence over `level`. Returns
/// `Ok(false)` if another subscriber was already installed.
pub fn init_tracing(level: &str, format: LogFormat) -> Result<bool, ConfigError> {
    let directive = std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| level.to_string());
    let filter = build_filter(&directive)?;

    let installed = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
            .is_ok(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .is_ok(),
    };
    Ok(installed)
}

impl LoggingConfig {
    pub fn init(&self) -> Result<bool, ConfigError> {
        init_tracing(&self.level, self.format)
    }
}

fn build_filter(directive: &str) -> Result<tracing_subscriber::EnvFilter, ConfigError> {
    tracing_subscriber::EnvFilter::try_new(directive)
        .map_err(|err| ConfigError::LogFilter(format!("{directive:?}: {err}")))
}
