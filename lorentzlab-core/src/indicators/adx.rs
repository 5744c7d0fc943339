//! ADX: Average Directional Index (Wilder).
//!
//! Steps:
//! 1. Compute +DM, -DM and TR from consecutive bars (defined from bar 1)
//! 2. Seed each with the mean of the first `period` values, then Wilder-smooth
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR), -DI likewise
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI), 0 when the sum is 0
//! 5. ADX = Wilder-smoothed DX
//!
//! First valid index: 2 * period - 1.

use super::IndicatorError;

/// Compute ADX from parallel high/low/close series. Warm-up values are `f64::NAN`.
pub fn adx(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
) -> Result<Vec<f64>, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidPeriod {
            name: "adx",
            period,
        });
    }
    if highs.len() != lows.len() || highs.len() != closes.len() {
        return Err(IndicatorError::LengthMismatch {
            highs: highs.len(),
            lows: lows.len(),
            closes: closes.len(),
        });
    }

    let n = highs.len();
    if n < 2 {
        return Ok(vec![f64::NAN; n]);
    }

    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];
    let mut tr = vec![f64::NAN; n];

    for i in 1..n {
        let up = highs[i] - highs[i - 1];
        let down = lows[i - 1] - lows[i];

        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };

        let pc = closes[i - 1];
        tr[i] = (highs[i] - lows[i])
            .max((highs[i] - pc).abs())
            .max((lows[i] - pc).abs());

        if up.is_nan() || down.is_nan() || pc.is_nan() {
            plus_dm[i] = f64::NAN;
            minus_dm[i] = f64::NAN;
            tr[i] = f64::NAN;
        }
    }

    let smooth_tr = wilder_smooth(&tr, period);
    let smooth_plus = wilder_smooth(&plus_dm, period);
    let smooth_minus = wilder_smooth(&minus_dm, period);

    let mut dx = vec![f64::NAN; n];
    for i in 0..n {
        if smooth_tr[i].is_nan() || smooth_plus[i].is_nan() || smooth_minus[i].is_nan() {
            continue;
        }
        if smooth_tr[i] == 0.0 {
            // No range at all: no directional movement either.
            dx[i] = 0.0;
            continue;
        }

        let plus_di = 100.0 * smooth_plus[i] / smooth_tr[i];
        let minus_di = 100.0 * smooth_minus[i] / smooth_tr[i];
        let di_sum = plus_di + minus_di;

        dx[i] = if di_sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / di_sum
        };
    }

    Ok(wilder_smooth(&dx, period))
}

/// Wilder smoothing: seed with the mean of the first `period` values after the
/// leading NaNs, then `avg = (avg * (period - 1) + value) / period`.
///
/// A NaN after the seed leaves the rest of the series as NaN.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };
    let seed_end = start + period;
    if period == 0 || seed_end > n {
        return result;
    }

    let seed_window = &values[start..seed_end];
    if seed_window.iter().any(|v| v.is_nan()) {
        return result;
    }

    let mut prev = seed_window.iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = prev;

    let p = period as f64;
    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        prev = (prev * (p - 1.0) + values[i]) / p;
        result[i] = prev;
    }

    result
}
