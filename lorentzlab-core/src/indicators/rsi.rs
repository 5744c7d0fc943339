//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! First valid index: period.
//! Edge case: avg_loss == 0 → RS is infinite and RSI saturates at 100.

use super::IndicatorError;

/// Compute RSI over a close series. Warm-up values are `f64::NAN`.
pub fn rsi(closes: &[f64], period: usize) -> Result<Vec<f64>, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod {
            name: "rsi",
            period,
        });
    }

    let n = closes.len();
    let mut result = vec![f64::NAN; n];

    if n < period + 1 {
        return Ok(result);
    }

    // Seed: average gain and average loss over first `period` changes
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let ch = closes[i] - closes[i - 1];
        if ch.is_nan() {
            return Ok(result);
        }
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    result[period] = compute_rsi(avg_gain, avg_loss);

    let p = period as f64;
    for i in (period + 1)..n {
        let ch = closes[i] - closes[i - 1];
        if ch.is_nan() {
            // NaN poisons the smoothing state; leave the tail as warm-up.
            return Ok(result);
        }

        let gain = ch.max(0.0);
        let loss = (-ch).max(0.0);

        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;

        result[i] = compute_rsi(avg_gain, avg_loss);
    }

    Ok(result)
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}
