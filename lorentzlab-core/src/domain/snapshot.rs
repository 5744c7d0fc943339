//! MarketSnapshot: one bar enriched with indicator and session context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of features in [`MarketSnapshot::feature_vector`].
pub const FEATURE_COUNT: usize = 4;

/// Optional cross-market context attached by upstream collaborators.
///
/// None of these fields feed the classifier; they travel with the snapshot
/// so downstream consumers see the same bar context the engine saw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotContext {
    pub correlation: Option<f64>,
    pub seasonal_bias: Option<f64>,
    pub mechanical_bias: Option<f64>,
}

/// Per-bar input to the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,

    // ── Indicators ──
    pub rsi_fast: f64,
    pub adx_fast: f64,
    pub rsi_slow: f64,
    pub adx_slow: f64,

    // ── Instrument ──
    pub pip_size: f64,
    pub pip_value: f64,

    // ── Session context ──
    pub daily_high: Option<f64>,
    pub daily_low: Option<f64>,
    pub weekly_high: Option<f64>,
    pub weekly_low: Option<f64>,
    pub prev_day_high: Option<f64>,
    pub prev_day_low: Option<f64>,
    pub prev_week_high: Option<f64>,
    pub prev_week_low: Option<f64>,

    #[serde(default)]
    pub context: SnapshotContext,
}

impl MarketSnapshot {
    /// Fixed-order classifier input: (rsi_fast, adx_fast, rsi_slow, adx_slow).
    pub fn feature_vector(&self) -> [f64; FEATURE_COUNT] {
        [self.rsi_fast, self.adx_fast, self.rsi_slow, self.adx_slow]
    }

    /// The current day's range in pips, if the session tracker supplied it.
    pub fn daily_range_pips(&self) -> Option<f64> {
        match (self.daily_high, self.daily_low) {
            (Some(high), Some(low)) if self.pip_size > 0.0 => Some((high - low) / self.pip_size),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            symbol: "EURUSD".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap(),
            open: 1.0850,
            high: 1.0870,
            low: 1.0840,
            close: 1.0865,
            rsi_fast: 61.0,
            adx_fast: 24.0,
            rsi_slow: 55.0,
            adx_slow: 19.0,
            pip_size: 0.0001,
            pip_value: 10.0,
            daily_high: Some(1.0890),
            daily_low: Some(1.0830),
            weekly_high: None,
            weekly_low: None,
            prev_day_high: None,
            prev_day_low: None,
            prev_week_high: None,
            prev_week_low: None,
            context: SnapshotContext::default(),
        }
    }

    #[test]
    fn feature_vector_order_is_fixed() {
        assert_eq!(snapshot().feature_vector(), [61.0, 24.0, 55.0, 19.0]);
    }

    #[test]
    fn daily_range_in_pips() {
        let range = snapshot().daily_range_pips().unwrap();
        assert!((range - 60.0).abs() < 1e-6);
    }

    #[test]
    fn zero_daily_low_is_not_treated_as_missing() {
        let mut snap = snapshot();
        snap.pip_size = 1.0;
        snap.daily_high = Some(5.0);
        snap.daily_low = Some(0.0);
        assert_eq!(snap.daily_range_pips(), Some(5.0));
    }

    #[test]
    fn snapshot_serialization_roundtrip() {
        let snap = snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: MarketSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, back);
    }
}
