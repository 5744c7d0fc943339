//! Position sizing and exposure/drawdown guardrails.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::performance::PerformanceMetrics;
use super::RiskError;
use crate::domain::{ActivePosition, CompletedTrade, Direction};

/// Account and guardrail parameters.
///
/// `balance` is the only field that changes during a run (via
/// [`RiskManager::update_equity`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskParameters {
    pub balance: f64,
    /// Fraction of balance risked per trade (0.01 = 1%).
    pub risk_per_trade: f64,
    /// Pip value used when a snapshot carries none.
    pub pip_value_per_standard_lot: f64,
    pub min_lot: f64,
    pub max_lot: Option<f64>,
    pub lot_step: f64,
    pub max_positions_per_symbol: usize,
    pub max_total_positions: usize,
    pub max_daily_drawdown_pct: Option<f64>,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            balance: 10_000.0,
            risk_per_trade: 0.01,
            pip_value_per_standard_lot: 10.0,
            min_lot: 0.01,
            max_lot: Some(50.0),
            lot_step: 0.01,
            max_positions_per_symbol: 2,
            max_total_positions: 5,
            max_daily_drawdown_pct: Some(5.0),
        }
    }
}

impl RiskParameters {
    pub fn validate(&self) -> Result<(), RiskError> {
        if !(self.risk_per_trade > 0.0 && self.risk_per_trade <= 1.0) {
            return Err(RiskError::InvalidConfig(format!(
                "risk_per_trade must be in (0, 1], got {}",
                self.risk_per_trade
            )));
        }
        if !(self.lot_step > 0.0) {
            return Err(RiskError::InvalidConfig("lot_step must be > 0".into()));
        }
        if self.min_lot < 0.0 {
            return Err(RiskError::InvalidConfig("min_lot must be >= 0".into()));
        }
        if let Some(max_lot) = self.max_lot {
            if max_lot < self.min_lot {
                return Err(RiskError::InvalidConfig(format!(
                    "max_lot {max_lot} is below min_lot {}",
                    self.min_lot
                )));
            }
        }
        if self.max_positions_per_symbol == 0 || self.max_total_positions == 0 {
            return Err(RiskError::InvalidConfig("position caps must be >= 1".into()));
        }
        if let Some(pct) = self.max_daily_drawdown_pct {
            if !(pct > 0.0 && pct <= 100.0) {
                return Err(RiskError::InvalidConfig(format!(
                    "max_daily_drawdown_pct must be in (0, 100], got {pct}"
                )));
            }
        }
        Ok(())
    }
}

/// Why a new position was refused.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpenRejection {
    TotalCap { open: usize, cap: usize },
    SymbolCap { open: usize, cap: usize },
    DailyDrawdown { balance: f64, floor: f64 },
}

impl std::fmt::Display for OpenRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpenRejection::TotalCap { open, cap } => {
                write!(f, "total position cap reached ({open}/{cap})")
            }
            OpenRejection::SymbolCap { open, cap } => {
                write!(f, "symbol position cap reached ({open}/{cap})")
            }
            OpenRejection::DailyDrawdown { balance, floor } => {
                write!(f, "daily drawdown limit hit (balance {balance:.2} <= floor {floor:.2})")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RiskManager {
    params: RiskParameters,
    /// Opening equity of the current UTC day.
    day_baseline: Option<(NaiveDate, f64)>,
    performance: PerformanceMetrics,
}

impl RiskManager {
    pub fn new(params: RiskParameters) -> Result<Self, RiskError> {
        params.validate()?;
        Ok(Self {
            params,
            day_baseline: None,
            performance: PerformanceMetrics::new(),
        })
    }

    pub fn params(&self) -> &RiskParameters {
        &self.params
    }

    pub fn balance(&self) -> f64 {
        self.params.balance
    }

    pub fn daily_baseline(&self) -> Option<(NaiveDate, f64)> {
        self.day_baseline
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance
    }

    /// Keep at most `limit` recent points on the equity curve (`None`: all).
    pub fn set_equity_curve_limit(&mut self, limit: Option<usize>) {
        self.performance.set_curve_limit(limit);
    }

    /// Push the latest equity. The first call on a new UTC date records that
    /// equity as the day's drawdown baseline.
    pub fn update_equity(&mut self, equity: f64, timestamp: DateTime<Utc>) {
        let today = timestamp.date_naive();
        match self.day_baseline {
            Some((day, _)) if day == today => {}
            _ => {
                tracing::debug!(%today, baseline = equity, "new daily drawdown baseline");
                self.day_baseline = Some((today, equity));
            }
        }
        self.params.balance = equity;
        self.performance.record_equity(equity);
    }

    pub fn record_trade(&mut self, trade: &CompletedTrade) {
        self.performance.record_trade(trade);
    }

    /// Check every guardrail for a prospective position.
    ///
    /// `equity`, when given, is checked against the drawdown floor instead of
    /// the last balance pushed through `update_equity`. Opposing positions on
    /// the same symbol count toward the symbol cap; callers close them first.
    pub fn check_open(
        &self,
        symbol: &str,
        open_positions: &[ActivePosition],
        equity: Option<f64>,
    ) -> Result<(), OpenRejection> {
        let total = open_positions.len();
        if total >= self.params.max_total_positions {
            return Err(OpenRejection::TotalCap {
                open: total,
                cap: self.params.max_total_positions,
            });
        }

        let same_symbol = open_positions.iter().filter(|p| p.symbol == symbol).count();
        if same_symbol >= self.params.max_positions_per_symbol {
            return Err(OpenRejection::SymbolCap {
                open: same_symbol,
                cap: self.params.max_positions_per_symbol,
            });
        }

        if let (Some(pct), Some((_, baseline))) =
            (self.params.max_daily_drawdown_pct, self.day_baseline)
        {
            let floor = baseline * (1.0 - pct / 100.0);
            let balance = equity.unwrap_or(self.params.balance);
            if balance <= floor {
                return Err(OpenRejection::DailyDrawdown { balance, floor });
            }
        }

        Ok(())
    }

    pub fn can_open(
        &self,
        symbol: &str,
        open_positions: &[ActivePosition],
        timestamp: DateTime<Utc>,
        direction: Direction,
        equity: Option<f64>,
    ) -> bool {
        match self.check_open(symbol, open_positions, equity) {
            Ok(()) => true,
            Err(reason) => {
                tracing::debug!(
                    symbol,
                    %timestamp,
                    direction = direction.as_i8(),
                    %reason,
                    "open rejected by risk manager"
                );
                false
            }
        }
    }

    /// Lots for a trade whose stop sits `stop_loss_pips` away.
    ///
    /// ```text
    /// risk_amount = balance * risk_per_trade
    /// raw_lot     = risk_amount / (stop_loss_pips * pip_value)
    /// lot         = max(floor_to_step(min(raw_lot, max_lot)), min_lot)
    /// ```
    /// Degenerate inputs (stop or pip value <= 0) size at `min_lot`.
    pub fn position_size(&self, stop_loss_pips: f64, pip_value: f64) -> f64 {
        let p = &self.params;
        if !(stop_loss_pips > 0.0) || !(pip_value > 0.0) {
            return p.min_lot;
        }

        let risk_amount = p.balance * p.risk_per_trade;
        let mut raw_lot = risk_amount / (stop_loss_pips * pip_value);
        if let Some(max_lot) = p.max_lot {
            raw_lot = raw_lot.min(max_lot);
        }

        // Small epsilon so that e.g. 0.3 / 0.1 floors to 3, not 2.
        let steps = ((raw_lot / p.lot_step) + 1e-9).floor().max(1.0);
        let lot = round_to_step(steps * p.lot_step, p.lot_step);
        lot.max(p.min_lot)
    }
}

/// Strip float noise from a multiple of `step` (0.30000000000000004 → 0.3).
fn round_to_step(value: f64, step: f64) -> f64 {
    let decimals = (-step.log10()).ceil().clamp(0.0, 12.0) as i32 + 2;
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
