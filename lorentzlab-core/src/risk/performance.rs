//! Performance metrics accumulated across a run.
//!
//! The aggregate is updated incrementally (one trade or equity point at a
//! time, O(1) each); the free functions below are pure and usable on their own.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::domain::CompletedTrade;

/// Profit factor reported when there are profits and no losses.
pub const PROFIT_FACTOR_CAP: f64 = 100.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub trade_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub hit_rate: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    /// Largest peak-to-trough decline over every recorded equity point, as a
    /// positive percent. Covers points already dropped from a bounded curve.
    pub max_drawdown_pct: f64,
    pub peak_equity: Option<f64>,
    pub equity_curve: VecDeque<f64>,
    /// Oldest points are dropped beyond this many; `None` keeps them all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve_limit: Option<usize>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics whose equity curve keeps at most `limit` recent points.
    pub fn with_curve_limit(limit: usize) -> Self {
        Self {
            curve_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn set_curve_limit(&mut self, limit: Option<usize>) {
        self.curve_limit = limit;
        self.trim_curve();
    }

    pub fn record_trade(&mut self, trade: &CompletedTrade) {
        self.trade_count += 1;
        if trade.profit > 0.0 {
            self.wins += 1;
            self.gross_profit += trade.profit;
        } else if trade.profit < 0.0 {
            self.losses += 1;
            self.gross_loss += trade.profit.abs();
        }
        self.hit_rate = self.wins as f64 / self.trade_count as f64;
        self.profit_factor = profit_factor(self.gross_profit, self.gross_loss);
    }

    pub fn record_equity(&mut self, equity: f64) {
        let peak = match self.peak_equity {
            Some(peak) if peak >= equity => peak,
            _ => equity,
        };
        self.peak_equity = Some(peak);
        if peak > 0.0 {
            self.max_drawdown_pct = self.max_drawdown_pct.max((peak - equity) / peak * 100.0);
        }

        self.equity_curve.push_back(equity);
        self.trim_curve();
    }

    fn trim_curve(&mut self) {
        if let Some(limit) = self.curve_limit {
            while self.equity_curve.len() > limit {
                self.equity_curve.pop_front();
            }
        }
    }

    pub fn net_profit(&self) -> f64 {
        self.gross_profit - self.gross_loss
    }
}

/// Gross profit / gross loss, capped at [`PROFIT_FACTOR_CAP`].
pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { PROFIT_FACTOR_CAP } else { 0.0 };
    }
    (gross_profit / gross_loss).min(PROFIT_FACTOR_CAP)
}

/// Maximum drawdown as a positive percentage (15.0 = 15% decline from peak).
///
/// Returns 0.0 if equity is constant or monotonically increasing.
pub fn max_drawdown_pct<'a, I>(equity_curve: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut curve = equity_curve.into_iter().copied().peekable();
    let Some(&first) = curve.peek() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for eq in curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.max((peak - eq) / peak * 100.0);
        }
    }
    max_dd
}
