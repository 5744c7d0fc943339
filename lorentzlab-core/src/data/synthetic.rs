//! Deterministic synthetic bars for tests, benches and demos.
//!
//! A seeded `StdRng` drives a Gaussian-ish random walk, so the same seed and
//! config always produce the same series.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::RawBar;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub bars: usize,
    pub start_price: f64,
    /// Largest close-to-close step, in price units.
    pub max_step: f64,
    /// Constant drift added to every step.
    pub drift: f64,
    pub interval: Duration,
    pub start: DateTime<Utc>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            bars: 500,
            start_price: 1.1000,
            max_step: 0.0015,
            drift: 0.0,
            interval: Duration::hours(1),
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }
}

/// Random-walk OHLC bars. Prices never go below one `max_step`.
pub fn random_walk_bars(config: &SyntheticConfig) -> Vec<RawBar> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let floor = config.max_step.max(f64::EPSILON);
    let mut close = config.start_price;
    let mut bars = Vec::with_capacity(config.bars);

    for i in 0..config.bars {
        let open = close;
        // Sum of two uniforms: cheap triangular approximation of a bell curve.
        let step = (rng.gen_range(-1.0..1.0) + rng.gen_range(-1.0..1.0)) * 0.5 * config.max_step;
        close = (open + step + config.drift).max(floor);
        let wick_up = rng.gen_range(0.0..0.5) * config.max_step;
        let wick_down = rng.gen_range(0.0..0.5) * config.max_step;
        let high = open.max(close) + wick_up;
        let low = (open.min(close) - wick_down).max(floor * 0.5);
        let volume = rng.gen_range(100.0..1000.0);

        bars.push(RawBar::new(
            config.start + config.interval * i as i32,
            open,
            high,
            low,
            close,
            volume,
        ));
    }
    bars
}

/// Strictly monotone closes: `start_price + i * step`. A negative step gives
/// a falling ramp.
pub fn ramp_bars(start: DateTime<Utc>, start_price: f64, step: f64, count: usize) -> Vec<RawBar> {
    let wick = step.abs() * 0.25;
    (0..count)
        .map(|i| {
            let close = start_price + step * i as f64;
            let open = close - step;
            RawBar::new(
                start + Duration::hours(i as i64),
                open,
                open.max(close) + wick,
                open.min(close) - wick,
                close,
                1000.0,
            )
        })
        .collect()
}
