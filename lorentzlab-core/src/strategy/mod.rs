//! Online k-nearest-neighbour strategy.
//!
//! The strategy keeps a bounded window of transformed feature rows, labels
//! each row once its lookahead has elapsed, and classifies every new bar by a
//! vote of its nearest labelled neighbours.

pub mod knn;
pub mod ring;

pub use knn::{FeatureRow, LorentzianKnnStrategy};
pub use ring::RowRing;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::FeatureError;

#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    #[error("invalid strategy config: {0}")]
    InvalidConfig(String),

    #[error("invalid pip size {pip_size} for {symbol}")]
    InvalidPipSize { symbol: String, pip_size: f64 },

    #[error("non-finite feature {index} ({value}) for {symbol}")]
    NonFiniteFeature {
        symbol: String,
        index: usize,
        value: f64,
    },

    #[error(transparent)]
    Feature(#[from] FeatureError),
}

/// Classifier parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnnConfig {
    /// Number of neighbours voting (k).
    pub neighbors: usize,
    /// Window capacity; the oldest row is evicted beyond this.
    pub max_rows: usize,
    /// Bars that must elapse before a row is labelled.
    pub label_lookahead: usize,
    /// Moves smaller than this (in pips) are labelled 0.
    pub neutral_zone_pips: f64,
}

impl KnnConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.neighbors == 0 {
            return Err(StrategyError::InvalidConfig("neighbors must be >= 1".into()));
        }
        if self.max_rows == 0 {
            return Err(StrategyError::InvalidConfig("max_rows must be >= 1".into()));
        }
        if !(self.neutral_zone_pips >= 0.0) {
            return Err(StrategyError::InvalidConfig(format!(
                "neutral_zone_pips must be >= 0, got {}",
                self.neutral_zone_pips
            )));
        }
        Ok(())
    }
}
