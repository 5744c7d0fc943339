//! Backtester: deterministic replay of a snapshot sequence through TradeLogic.
//!
//! Two entry points:
//! - `Backtester::run()`: replays pre-built snapshots.
//! - `run_backtest_from_bars()`: raw bars → IndicatorEngine → Backtester,
//!   stamped with the config fingerprint.
//!
//! Accounting is realized-only: equity moves when a position closes, so
//! `ending_equity == initial_equity + Σ trade.profit` holds exactly.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lorentzlab_core::domain::{
    ActivePosition, CompletedTrade, DecisionAction, DecisionReason, MarketSnapshot, RawBar,
    TradeDecision, EXIT_REASON_KEY,
};
use lorentzlab_core::indicators::{IndicatorEngine, IndicatorError};
use lorentzlab_core::logic::close_decision;
use lorentzlab_core::risk::PerformanceMetrics;
use lorentzlab_core::{TradeLogic, TradeLogicError};

use crate::config::{BacktestSettings, ConfigError, EngineConfig, RunId};

/// Metadata key for the signal confidence at entry.
pub const ENTRY_CONFIDENCE_KEY: &str = "entry_confidence";

#[derive(Debug, Error)]
pub enum BacktestError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("trade logic error: {0}")]
    Logic(#[from] TradeLogicError),

    #[error("snapshot {index} at {current} is not after the previous one at {previous}")]
    OutOfOrder {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

/// Complete result of a single replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Config fingerprint, when the run was built from an `EngineConfig`.
    pub run_id: Option<RunId>,
    pub decisions: Vec<TradeDecision>,
    pub trades: Vec<CompletedTrade>,
    pub performance: PerformanceMetrics,
    pub initial_equity: f64,
    pub ending_equity: f64,
    pub bar_count: usize,
}

impl BacktestResult {
    pub fn net_profit(&self) -> f64 {
        self.ending_equity - self.initial_equity
    }
}

/// An open position plus the bookkeeping the replay needs at close time.
#[derive(Debug, Clone)]
struct OpenEntry {
    position: ActivePosition,
    confidence: Option<f64>,
}

#[derive(Debug)]
pub struct Backtester {
    logic: TradeLogic,
    settings: BacktestSettings,
}

impl Backtester {
    pub fn new(logic: TradeLogic, settings: BacktestSettings) -> Self {
        Self { logic, settings }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        let mut risk = config.risk.clone();
        risk.balance = config.backtest.initial_equity;
        let logic = TradeLogic::new(config.trade.clone(), risk)?;
        Ok(Self::new(logic, config.backtest.clone()))
    }

    pub fn logic(&self) -> &TradeLogic {
        &self.logic
    }

    /// Replay `snapshots` in order. Timestamps must be strictly increasing.
    pub fn run(mut self, snapshots: &[MarketSnapshot]) -> Result<BacktestResult, BacktestError> {
        check_ordering(snapshots)?;

        let symbol = snapshots.first().map(|s| s.symbol.as_str()).unwrap_or("");
        let span = tracing::info_span!("backtest", symbol, bars = snapshots.len());
        let _enter = span.enter();

        let initial_equity = self.settings.initial_equity;
        let mut equity = initial_equity;
        let mut book: Vec<OpenEntry> = Vec::new();
        let mut positions: Vec<ActivePosition> = Vec::new();
        let mut decisions = Vec::new();
        let mut trades = Vec::new();

        for snapshot in snapshots {
            self.logic
                .risk_mut()
                .update_equity(equity, snapshot.timestamp);

            positions.clear();
            positions.extend(book.iter().map(|e| e.position.clone()));
            let bar_decisions = self.logic.on_bar(snapshot, &positions, Some(equity))?;

            for decision in bar_decisions {
                if let Some(trade) = self.apply(&mut book, &decision, snapshot) {
                    equity += trade.profit;
                    self.logic.risk_mut().record_trade(&trade);
                    trades.push(trade);
                }
                decisions.push(decision);
            }
        }

        if let Some(last) = snapshots.last() {
            for entry in std::mem::take(&mut book) {
                let decision = close_decision(
                    &entry.position,
                    last.close,
                    DecisionReason::ForcedExit,
                    last.timestamp,
                );
                let trade = realize(&entry, &decision, last);
                equity += trade.profit;
                self.logic.risk_mut().record_trade(&trade);
                trades.push(trade);
                decisions.push(decision);
            }
            self.logic.risk_mut().update_equity(equity, last.timestamp);
        }

        tracing::info!(
            trades = trades.len(),
            decisions = decisions.len(),
            initial_equity,
            ending_equity = equity,
            "backtest complete"
        );

        Ok(BacktestResult {
            run_id: None,
            decisions,
            trades,
            performance: self.logic.risk().performance().clone(),
            initial_equity,
            ending_equity: equity,
            bar_count: snapshots.len(),
        })
    }

    /// Apply one decision to the book. Returns the trade a close realizes.
    fn apply(
        &self,
        book: &mut Vec<OpenEntry>,
        decision: &TradeDecision,
        snapshot: &MarketSnapshot,
    ) -> Option<CompletedTrade> {
        match decision.action {
            DecisionAction::Open => {
                let slip = self.settings.slippage_pips * snapshot.pip_size;
                let entry_price = decision.price + decision.direction.sign() * slip;
                tracing::info!(
                    symbol = %decision.symbol,
                    side = ?decision.direction,
                    size = decision.size,
                    entry_price,
                    "position opened"
                );
                book.push(OpenEntry {
                    position: ActivePosition {
                        symbol: decision.symbol.clone(),
                        direction: decision.direction,
                        size: decision.size,
                        entry_price,
                        stop_loss: decision.stop_loss,
                        take_profit: decision.take_profit,
                        opened_at: decision.timestamp,
                    },
                    confidence: decision.signal.map(|s| s.confidence),
                });
                None
            }
            DecisionAction::Close => {
                let Some(index) = find_matching(book, decision) else {
                    tracing::warn!(
                        symbol = %decision.symbol,
                        side = ?decision.direction,
                        "close decision without a matching position"
                    );
                    return None;
                };
                let entry = book.remove(index);
                Some(realize(&entry, decision, snapshot))
            }
            DecisionAction::Modify => {
                if let Some(index) = find_matching(book, decision) {
                    let position = &mut book[index].position;
                    if decision.stop_loss.is_some() {
                        position.stop_loss = decision.stop_loss;
                    }
                    if decision.take_profit.is_some() {
                        position.take_profit = decision.take_profit;
                    }
                }
                None
            }
        }
    }
}

fn find_matching(book: &[OpenEntry], decision: &TradeDecision) -> Option<usize> {
    book.iter().position(|e| {
        e.position.symbol == decision.symbol && e.position.direction == decision.direction
    })
}

fn realize(entry: &OpenEntry, decision: &TradeDecision, snapshot: &MarketSnapshot) -> CompletedTrade {
    let position = &entry.position;
    let pips = position.unrealized_pips(decision.price, snapshot.pip_size);
    let profit = pips * snapshot.pip_value * position.size;

    let mut metadata = BTreeMap::new();
    metadata.insert(EXIT_REASON_KEY.to_string(), decision.reason.as_str().to_string());
    if let Some(confidence) = entry.confidence {
        metadata.insert(ENTRY_CONFIDENCE_KEY.to_string(), format!("{confidence:.4}"));
    }

    tracing::info!(
        symbol = %position.symbol,
        side = ?position.direction,
        pips,
        profit,
        reason = decision.reason.as_str(),
        "position closed"
    );

    CompletedTrade {
        symbol: position.symbol.clone(),
        direction: position.direction,
        size: position.size,
        entry_price: position.entry_price,
        exit_price: decision.price,
        opened_at: position.opened_at,
        closed_at: decision.timestamp,
        profit,
        pips,
        metadata,
    }
}

fn check_ordering(snapshots: &[MarketSnapshot]) -> Result<(), BacktestError> {
    for (index, pair) in snapshots.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(BacktestError::OutOfOrder {
                index: index + 1,
                previous: pair[0].timestamp,
                current: pair[1].timestamp,
            });
        }
    }
    Ok(())
}

/// Full pipeline: derive snapshots from raw bars, then replay them.
pub fn run_backtest_from_bars(
    bars: &[RawBar],
    config: &EngineConfig,
) -> Result<BacktestResult, BacktestError> {
    config.validate()?;
    let engine = IndicatorEngine::new(config.indicators, config.instrument.meta())?;
    let snapshots = engine.build(bars)?;
    tracing::debug!(
        bars = bars.len(),
        snapshots = snapshots.len(),
        warmup = engine.warmup_bars(),
        "snapshots derived"
    );

    let mut result = Backtester::from_config(config)?.run(&snapshots)?;
    result.run_id = Some(config.fingerprint()?);
    Ok(result)
}
