//! Risk management: position sizing, exposure caps, the daily drawdown
//! guard, the ADR tracker and run performance metrics.

pub mod adr;
pub mod manager;
pub mod performance;

pub use adr::AdrTracker;
pub use manager::{OpenRejection, RiskManager, RiskParameters};
pub use performance::{max_drawdown_pct, profit_factor, PerformanceMetrics, PROFIT_FACTOR_CAP};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RiskError {
    #[error("invalid risk config: {0}")]
    InvalidConfig(String),
}
