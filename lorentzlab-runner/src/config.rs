//! Serializable engine configuration, loaded from TOML.
//!
//! ```toml
//! [instrument]
//! symbol = "EURUSD"
//! pip_size = 0.0001
//! pip_value = 10.0
//!
//! [trade]
//! neighbors = 8
//! use_adr = true
//!
//! [risk]
//! risk_per_trade = 0.01
//! ```
//!
//! Every table and field is optional; omitted values take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lorentzlab_core::domain::InstrumentMeta;
use lorentzlab_core::indicators::IndicatorConfig;
use lorentzlab_core::risk::RiskParameters;
use lorentzlab_core::TradeConfig;

/// Content hash of an [`EngineConfig`] (hex blake3).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid log filter: {0}")]
    LogFilter(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub pip_size: f64,
    /// Value of one pip for one standard lot, in account currency.
    pub pip_value: f64,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "EURUSD".into(),
            pip_size: 0.0001,
            pip_value: 10.0,
        }
    }
}

impl InstrumentConfig {
    pub fn meta(&self) -> InstrumentMeta {
        InstrumentMeta::new(self.symbol.clone(), self.pip_size, self.pip_value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_equity: f64,
    /// Adverse entry slippage, in pips.
    pub slippage_pips: f64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_equity: 10_000.0,
            slippage_pips: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `lorentzlab_runner=debug`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}

/// Everything needed to reproduce a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub instrument: InstrumentConfig,
    pub indicators: IndicatorConfig,
    pub trade: TradeConfig,
    pub risk: RiskParameters,
    pub backtest: BacktestSettings,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |e: &dyn std::fmt::Display| ConfigError::Invalid(e.to_string());

        if self.instrument.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("instrument.symbol is empty".into()));
        }
        if !(self.instrument.pip_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "instrument.pip_size must be > 0, got {}",
                self.instrument.pip_size
            )));
        }
        if !(self.instrument.pip_value > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "instrument.pip_value must be > 0, got {}",
                self.instrument.pip_value
            )));
        }
        self.indicators.validate().map_err(|e| invalid(&e))?;
        self.trade.validate().map_err(|e| invalid(&e))?;
        self.risk.validate().map_err(|e| invalid(&e))?;
        if !(self.backtest.initial_equity > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "backtest.initial_equity must be > 0, got {}",
                self.backtest.initial_equity
            )));
        }
        if !(self.backtest.slippage_pips >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "backtest.slippage_pips must be >= 0, got {}",
                self.backtest.slippage_pips
            )));
        }
        Ok(())
    }

    /// Deterministic hash of the canonical JSON form.
    ///
    /// Two runs with identical configs share a fingerprint, so results can be
    /// cached and compared across runs.
    pub fn fingerprint(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
