//! IndicatorEngine: raw bars in, market snapshots out.

use serde::{Deserialize, Serialize};

use super::sessions::SessionTracker;
use super::{adx, rsi, IndicatorError};
use crate::domain::{InstrumentMeta, MarketSnapshot, RawBar, SnapshotContext};

/// Indicator periods for the four classifier features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_fast: usize,
    pub adx_fast: usize,
    pub rsi_slow: usize,
    pub adx_slow: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_fast: 7,
            adx_fast: 7,
            rsi_slow: 14,
            adx_slow: 14,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<(), IndicatorError> {
        for (name, period) in [
            ("rsi_fast", self.rsi_fast),
            ("adx_fast", self.adx_fast),
            ("rsi_slow", self.rsi_slow),
            ("adx_slow", self.adx_slow),
        ] {
            if period == 0 {
                return Err(IndicatorError::InvalidPeriod { name, period });
            }
        }
        Ok(())
    }
}

/// Derives RSI/ADX and session context from a bar stream.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
    instrument: InstrumentMeta,
}

impl IndicatorEngine {
    pub fn new(config: IndicatorConfig, instrument: InstrumentMeta) -> Result<Self, IndicatorError> {
        config.validate()?;
        Ok(Self { config, instrument })
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    pub fn instrument(&self) -> &InstrumentMeta {
        &self.instrument
    }

    /// Number of leading bars dropped before every indicator is defined.
    pub fn warmup_bars(&self) -> usize {
        let c = &self.config;
        c.rsi_fast
            .max(c.rsi_slow)
            .max(2 * c.adx_fast - 1)
            .max(2 * c.adx_slow - 1)
    }

    /// Build one snapshot per bar once all indicators are defined.
    ///
    /// Session levels are tracked from the very first bar so that snapshots
    /// right after warm-up already carry previous-day/week context.
    pub fn build(&self, bars: &[RawBar]) -> Result<Vec<MarketSnapshot>, IndicatorError> {
        if let Some(index) = bars
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(IndicatorError::NonMonotonicTimestamp { index: index + 1 });
        }

        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let c = &self.config;
        let rsi_fast = rsi(&closes, c.rsi_fast)?;
        let rsi_slow = rsi(&closes, c.rsi_slow)?;
        let adx_fast = adx(&highs, &lows, &closes, c.adx_fast)?;
        let adx_slow = adx(&highs, &lows, &closes, c.adx_slow)?;

        let warmup = self.warmup_bars();
        let mut sessions = SessionTracker::new();
        let mut snapshots = Vec::with_capacity(bars.len().saturating_sub(warmup));

        for (i, bar) in bars.iter().enumerate() {
            let levels = sessions.update(bar.timestamp, bar.high, bar.low);
            if i < warmup {
                continue;
            }

            let features = [rsi_fast[i], adx_fast[i], rsi_slow[i], adx_slow[i]];
            if features.iter().any(|v| v.is_nan()) {
                continue;
            }

            snapshots.push(MarketSnapshot {
                symbol: self.instrument.symbol.clone(),
                timestamp: bar.timestamp,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                rsi_fast: features[0],
                adx_fast: features[1],
                rsi_slow: features[2],
                adx_slow: features[3],
                pip_size: self.instrument.pip_size,
                pip_value: self.instrument.pip_value,
                daily_high: levels.daily_high,
                daily_low: levels.daily_low,
                weekly_high: levels.weekly_high,
                weekly_low: levels.weekly_low,
                prev_day_high: levels.prev_day_high,
                prev_day_low: levels.prev_day_low,
                prev_week_high: levels.prev_week_high,
                prev_week_low: levels.prev_week_low,
                context: SnapshotContext::default(),
            });
        }

        tracing::debug!(
            symbol = %self.instrument.symbol,
            bars = bars.len(),
            snapshots = snapshots.len(),
            warmup,
            "built market snapshots"
        );

        Ok(snapshots)
    }
}
