//! TradeLogic: turns one snapshot into open/close decisions.
//!
//! Per bar:
//! 1. Feed the ADR tracker from the snapshot's daily high/low
//! 2. Classify the bar (no signal, neutral, or low confidence ends here)
//! 3. Ask the risk manager whether a new position is allowed
//! 4. Close same-symbol positions that oppose the signal
//! 5. Derive stop/take distances (ADR-scaled or fixed pips)
//! 6. Size the position from the stop distance
//! 7. Emit the open decision

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    ActivePosition, DecisionAction, DecisionReason, MarketSnapshot, TradeDecision, TradeSignal,
};
use crate::risk::{AdrTracker, RiskError, RiskManager, RiskParameters};
use crate::strategy::{KnnConfig, LorentzianKnnStrategy, StrategyError};

/// Smallest ADR-derived stop/take distance, in pips.
pub const MIN_ADR_DISTANCE_PIPS: f64 = 0.1;

#[derive(Debug, Error, PartialEq)]
pub enum TradeLogicError {
    #[error("invalid trade config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Risk(#[from] RiskError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeConfig {
    pub neighbors: usize,
    pub max_rows: usize,
    pub label_lookahead: usize,
    pub neutral_zone_pips: f64,
    pub stop_loss_pips: f64,
    pub take_profit_pips: f64,
    /// Scale stop/take from the average daily range instead of fixed pips.
    pub use_adr: bool,
    pub adr_period: usize,
    pub adr_stop_factor: f64,
    pub adr_take_factor: f64,
    pub min_confidence: f64,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            neighbors: 8,
            max_rows: 2000,
            label_lookahead: 4,
            neutral_zone_pips: 5.0,
            stop_loss_pips: 20.0,
            take_profit_pips: 40.0,
            use_adr: false,
            adr_period: 14,
            adr_stop_factor: 0.5,
            adr_take_factor: 1.0,
            min_confidence: 0.0,
        }
    }
}

impl TradeConfig {
    pub fn knn_config(&self) -> KnnConfig {
        KnnConfig {
            neighbors: self.neighbors,
            max_rows: self.max_rows,
            label_lookahead: self.label_lookahead,
            neutral_zone_pips: self.neutral_zone_pips,
        }
    }

    pub fn validate(&self) -> Result<(), TradeLogicError> {
        self.knn_config().validate()?;
        if !(self.stop_loss_pips > 0.0) || !(self.take_profit_pips > 0.0) {
            return Err(TradeLogicError::InvalidConfig(format!(
                "stop_loss_pips and take_profit_pips must be > 0, got {} / {}",
                self.stop_loss_pips, self.take_profit_pips
            )));
        }
        if self.adr_period == 0 {
            return Err(TradeLogicError::InvalidConfig("adr_period must be >= 1".into()));
        }
        if !(self.adr_stop_factor > 0.0) || !(self.adr_take_factor > 0.0) {
            return Err(TradeLogicError::InvalidConfig("ADR factors must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(TradeLogicError::InvalidConfig(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        Ok(())
    }
}

/// Stop and take-profit distances for one entry, in pips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exits {
    pub stop_pips: f64,
    pub take_pips: f64,
}

#[derive(Debug)]
pub struct TradeLogic {
    config: TradeConfig,
    strategy: LorentzianKnnStrategy,
    risk: RiskManager,
    adr: AdrTracker,
}

impl TradeLogic {
    /// Logic with the default strategy components (Welford scaler, Lorentzian distance).
    pub fn new(config: TradeConfig, risk_params: RiskParameters) -> Result<Self, TradeLogicError> {
        config.validate()?;
        let strategy = LorentzianKnnStrategy::new(config.knn_config())?;
        Self::with_strategy(config, strategy, risk_params)
    }

    /// Logic around a caller-built strategy, e.g. one with a custom transform
    /// or distance metric. The strategy must run with `config.knn_config()`.
    pub fn with_strategy(
        config: TradeConfig,
        strategy: LorentzianKnnStrategy,
        risk_params: RiskParameters,
    ) -> Result<Self, TradeLogicError> {
        config.validate()?;
        let expected = config.knn_config();
        if strategy.config() != &expected {
            return Err(TradeLogicError::InvalidConfig(format!(
                "strategy runs with {:?} but trade config expects {:?}",
                strategy.config(),
                expected
            )));
        }
        Ok(Self {
            adr: AdrTracker::new(config.adr_period)?,
            risk: RiskManager::new(risk_params)?,
            config,
            strategy,
        })
    }

    pub fn config(&self) -> &TradeConfig {
        &self.config
    }

    pub fn strategy(&self) -> &LorentzianKnnStrategy {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut LorentzianKnnStrategy {
        &mut self.strategy
    }

    pub fn risk(&self) -> &RiskManager {
        &self.risk
    }

    pub fn risk_mut(&mut self) -> &mut RiskManager {
        &mut self.risk
    }

    pub fn adr(&self) -> &AdrTracker {
        &self.adr
    }

    /// Run the per-bar state machine. `open_positions` is the caller's view of
    /// what is currently open; it is not modified here.
    pub fn on_bar(
        &mut self,
        snapshot: &MarketSnapshot,
        open_positions: &[ActivePosition],
        account_equity: Option<f64>,
    ) -> Result<Vec<TradeDecision>, TradeLogicError> {
        if let (Some(high), Some(low)) = (snapshot.daily_high, snapshot.daily_low) {
            self.adr.update(snapshot.timestamp, high, low, snapshot.pip_size);
        }

        let Some(signal) = self.strategy.update(snapshot)? else {
            return Ok(Vec::new());
        };
        let Some(side) = signal.direction.side() else {
            return Ok(Vec::new());
        };
        if signal.confidence < self.config.min_confidence {
            tracing::debug!(
                symbol = %snapshot.symbol,
                confidence = signal.confidence,
                min_confidence = self.config.min_confidence,
                "signal below confidence threshold"
            );
            return Ok(Vec::new());
        }

        if !self.risk.can_open(
            &snapshot.symbol,
            open_positions,
            snapshot.timestamp,
            signal.direction,
            account_equity,
        ) {
            return Ok(Vec::new());
        }

        let mut decisions: Vec<TradeDecision> = open_positions
            .iter()
            .filter(|p| p.symbol == snapshot.symbol && p.direction != side)
            .map(|p| reverse_close(p, snapshot, signal))
            .collect();

        let exits = self.exit_distances();
        let pip_value = if snapshot.pip_value > 0.0 {
            snapshot.pip_value
        } else {
            self.risk.params().pip_value_per_standard_lot
        };
        let size = self.risk.position_size(exits.stop_pips, pip_value);

        let entry = snapshot.close;
        let stop_offset = exits.stop_pips * snapshot.pip_size;
        let take_offset = exits.take_pips * snapshot.pip_size;
        let sign = side.sign();
        decisions.push(TradeDecision {
            action: DecisionAction::Open,
            symbol: snapshot.symbol.clone(),
            direction: side,
            size,
            price: entry,
            stop_loss: Some(entry - sign * stop_offset),
            take_profit: Some(entry + sign * take_offset),
            reason: DecisionReason::KnnSignal,
            signal: Some(signal),
            timestamp: snapshot.timestamp,
        });

        tracing::debug!(
            symbol = %snapshot.symbol,
            ?side,
            size,
            confidence = signal.confidence,
            decisions = decisions.len(),
            "trade logic emitted decisions"
        );
        Ok(decisions)
    }

    /// Stop/take distances for a new entry given the current ADR state.
    pub fn exit_distances(&self) -> Exits {
        match (self.config.use_adr, self.adr.value()) {
            (true, Some(adr)) => Exits {
                stop_pips: (adr * self.config.adr_stop_factor).max(MIN_ADR_DISTANCE_PIPS),
                take_pips: (adr * self.config.adr_take_factor).max(MIN_ADR_DISTANCE_PIPS),
            },
            _ => Exits {
                stop_pips: self.config.stop_loss_pips,
                take_pips: self.config.take_profit_pips,
            },
        }
    }
}

fn reverse_close(
    position: &ActivePosition,
    snapshot: &MarketSnapshot,
    signal: TradeSignal,
) -> TradeDecision {
    TradeDecision {
        action: DecisionAction::Close,
        symbol: position.symbol.clone(),
        direction: position.direction,
        size: position.size,
        price: snapshot.close,
        stop_loss: None,
        take_profit: None,
        reason: DecisionReason::ReverseSignal,
        signal: Some(signal),
        timestamp: snapshot.timestamp,
    }
}

/// Close decision for `position` at `price` with an explicit reason. Used by
/// the harnesses for forced and manual exits.
pub fn close_decision(
    position: &ActivePosition,
    price: f64,
    reason: DecisionReason,
    timestamp: DateTime<Utc>,
) -> TradeDecision {
    TradeDecision {
        action: DecisionAction::Close,
        symbol: position.symbol.clone(),
        direction: position.direction,
        size: position.size,
        price,
        stop_loss: None,
        take_profit: None,
        reason,
        signal: None,
        timestamp,
    }
}
