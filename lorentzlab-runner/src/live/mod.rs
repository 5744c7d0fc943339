//! Live execution: the realtime loop and the collaborators it drives.
//!
//! The executor talks to three blocking collaborators through traits so that
//! in-memory, file-backed and network implementations are interchangeable:
//! - [`BrokerConnector`]: source of truth for open positions, executes decisions
//! - [`StateStore`]: persists the executor's position list between restarts
//! - [`HealthMonitor`]: receives one heartbeat per processed snapshot

pub mod executor;
pub mod health;
pub mod paper;
pub mod state;

pub use executor::{ExecutorError, FailedDecision, RealtimeExecutor};
pub use health::{Heartbeat, TracingHealthMonitor};
pub use paper::PaperBroker;
pub use state::{JsonFileStateStore, MemoryStateStore};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use lorentzlab_core::domain::{ActivePosition, TradeDecision};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("broker error: {0}")]
    Broker(String),

    #[error("state store error: {0}")]
    State(String),

    #[error("health monitor error: {0}")]
    Health(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub trait BrokerConnector {
    fn fetch_open_positions(&mut self) -> Result<Vec<ActivePosition>, CollaboratorError>;

    fn execute(&mut self, decision: &TradeDecision) -> Result<(), CollaboratorError>;
}

pub trait StateStore {
    fn load(&self) -> Result<Vec<ActivePosition>, CollaboratorError>;

    fn save(&mut self, positions: &[ActivePosition]) -> Result<(), CollaboratorError>;
}

pub trait HealthMonitor {
    fn record_status(
        &mut self,
        status: &str,
        timestamp: DateTime<Utc>,
        details: &BTreeMap<String, serde_json::Value>,
    ) -> Result<(), CollaboratorError>;
}

/// Apply a successfully executed decision to a position list.
///
/// Opens append, closes remove the first position with the same symbol and
/// side, modifies update stop/take in place. Returns false when a close or
/// modify found nothing to act on.
pub fn mirror_decision(positions: &mut Vec<ActivePosition>, decision: &TradeDecision) -> bool {
    use lorentzlab_core::domain::DecisionAction;

    let matching = |p: &ActivePosition| p.symbol == decision.symbol && p.direction == decision.direction;
    match decision.action {
        DecisionAction::Open => {
            positions.push(ActivePosition {
                symbol: decision.symbol.clone(),
                direction: decision.direction,
                size: decision.size,
                entry_price: decision.price,
                stop_loss: decision.stop_loss,
                take_profit: decision.take_profit,
                opened_at: decision.timestamp,
            });
            true
        }
        DecisionAction::Close => match positions.iter().position(matching) {
            Some(index) => {
                positions.remove(index);
                true
            }
            None => false,
        },
        DecisionAction::Modify => match positions.iter_mut().find(|p| matching(p)) {
            Some(position) => {
                if decision.stop_loss.is_some() {
                    position.stop_loss = decision.stop_loss;
                }
                if decision.take_profit.is_some() {
                    position.take_profit = decision.take_profit;
                }
                true
            }
            None => false,
        },
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, TimeZone, Utc};
    use lorentzlab_core::domain::{
        DecisionAction, DecisionReason, MarketSnapshot, Side, SnapshotContext, TradeDecision,
    };

    pub fn decision(action: DecisionAction, direction: Side) -> TradeDecision {
        TradeDecision {
            action,
            symbol: "EURUSD".into(),
            direction,
            size: 0.1,
            price: 1.1,
            stop_loss: Some(1.09),
            take_profit: Some(1.12),
            reason: DecisionReason::KnnSignal,
            signal: None,
            timestamp: Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap(),
        }
    }

    pub fn snapshot(i: i64, close: f64) -> MarketSnapshot {
        MarketSnapshot {
            symbol: "EURUSD".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap() + Duration::hours(i),
            open: close,
            high: close,
            low: close,
            close,
            rsi_fast: 50.0,
            adx_fast: 20.0,
            rsi_slow: 50.0,
            adx_slow: 20.0,
            pip_size: 0.0001,
            pip_value: 10.0,
            daily_high: None,
            daily_low: None,
            weekly_high: None,
            weekly_low: None,
            prev_day_high: None,
            prev_day_low: None,
            prev_week_high: None,
            prev_week_low: None,
            context: SnapshotContext::default(),
        }
    }
}
