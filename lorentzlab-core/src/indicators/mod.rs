//! Indicator derivation.
//!
//! RSI and ADX are computed over whole slices (NaN during warm-up) and then
//! stitched into per-bar [`MarketSnapshot`](crate::domain::MarketSnapshot)s
//! by the [`IndicatorEngine`], together with daily/weekly session levels.

pub mod adx;
pub mod engine;
pub mod rsi;
pub mod sessions;

pub use adx::{adx, wilder_smooth};
pub use engine::{IndicatorConfig, IndicatorEngine};
pub use rsi::rsi;
pub use sessions::{SessionLevels, SessionTracker};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    #[error("{name} period must be >= 1, got {period}")]
    InvalidPeriod { name: &'static str, period: usize },

    #[error("series length mismatch: highs={highs}, lows={lows}, closes={closes}")]
    LengthMismatch {
        highs: usize,
        lows: usize,
        closes: usize,
    },

    #[error("bar timestamps must be strictly increasing (violated at index {index})")]
    NonMonotonicTimestamp { index: usize },
}

/// Create hourly synthetic bars from close prices for testing.
///
/// open = prev_close (or close for first bar),
/// high = max(open,close) + 0.001, low = min(open,close) - 0.001.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::RawBar> {
    use crate::domain::RawBar;
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            RawBar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 0.001,
                low: open.min(close) - 0.001,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}
