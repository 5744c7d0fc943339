//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Position sizing: monotone in balance and stop distance, lot-step aligned,
//!    never below the minimum lot
//! 2. Label immutability: a row's label is assigned once and never changes
//! 3. Scaler statistics: the running mean matches the batch mean
//! 4. Daily drawdown: once breached, every open is refused until the next day

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashMap;

use lorentzlab_core::domain::{Direction, MarketSnapshot, SnapshotContext};
use lorentzlab_core::features::{FeatureTransform, WelfordScaler};
use lorentzlab_core::risk::{RiskManager, RiskParameters};
use lorentzlab_core::strategy::{KnnConfig, LorentzianKnnStrategy};

// ── Helpers ──────────────────────────────────────────────────────────

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()
}

fn snapshot(i: usize, close: f64, features: [f64; 4]) -> MarketSnapshot {
    MarketSnapshot {
        symbol: "EURUSD".into(),
        timestamp: start() + Duration::hours(i as i64),
        open: close,
        high: close,
        low: close,
        close,
        rsi_fast: features[0],
        adx_fast: features[1],
        rsi_slow: features[2],
        adx_slow: features[3],
        pip_size: 0.0001,
        pip_value: 10.0,
        daily_high: None,
        daily_low: None,
        weekly_high: None,
        weekly_low: None,
        prev_day_high: None,
        prev_day_low: None,
        prev_week_high: None,
        prev_week_low: None,
        context: SnapshotContext::default(),
    }
}

fn manager(balance: f64) -> RiskManager {
    RiskManager::new(RiskParameters {
        balance,
        ..RiskParameters::default()
    })
    .unwrap()
}

fn arb_bar() -> impl Strategy<Value = (f64, [f64; 4])> {
    (
        1.0..1.2_f64,
        prop::array::uniform4(0.0..100.0_f64),
    )
}

// ── 1. Position sizing ───────────────────────────────────────────────

proptest! {
    #[test]
    fn size_non_decreasing_in_balance(
        balance in 100.0..1_000_000.0_f64,
        extra in 0.0..1_000_000.0_f64,
        stop in 1.0..200.0_f64,
    ) {
        let small = manager(balance).position_size(stop, 10.0);
        let large = manager(balance + extra).position_size(stop, 10.0);
        prop_assert!(large >= small, "{large} < {small}");
    }

    #[test]
    fn size_non_increasing_in_stop(
        balance in 100.0..1_000_000.0_f64,
        stop in 1.0..200.0_f64,
        extra in 0.0..200.0_f64,
    ) {
        let rm = manager(balance);
        let tight = rm.position_size(stop, 10.0);
        let wide = rm.position_size(stop + extra, 10.0);
        prop_assert!(wide <= tight, "{wide} > {tight}");
    }

    #[test]
    fn size_is_step_aligned_and_bounded(
        balance in 0.0..1_000_000.0_f64,
        stop in -10.0..500.0_f64,
        pip_value in -1.0..50.0_f64,
    ) {
        let rm = manager(balance);
        let params = rm.params().clone();
        let lot = rm.position_size(stop, pip_value);

        prop_assert!(lot >= params.min_lot);
        prop_assert!(lot <= params.max_lot.unwrap_or(f64::INFINITY) + 1e-9);
        let steps = lot / params.lot_step;
        prop_assert!((steps - steps.round()).abs() < 1e-6, "{lot} not a multiple of step");
    }
}

// ── 2. Label immutability ────────────────────────────────────────────

proptest! {
    #[test]
    fn labels_are_assigned_once(
        bars in prop::collection::vec(arb_bar(), 5..80),
        lookahead in 0usize..5,
        neighbors in 1usize..6,
    ) {
        let config = KnnConfig {
            neighbors,
            max_rows: 30,
            label_lookahead: lookahead,
            neutral_zone_pips: 3.0,
        };
        let mut strategy = LorentzianKnnStrategy::new(config).unwrap();
        let mut seen: HashMap<DateTime<Utc>, i8> = HashMap::new();

        for (i, (close, features)) in bars.iter().enumerate() {
            strategy.update(&snapshot(i, *close, *features)).unwrap();

            let rows: Vec<_> = strategy.rows().collect();
            for (pos, row) in rows.iter().enumerate() {
                let age = rows.len() - 1 - pos;
                match row.label() {
                    Some(label) => {
                        prop_assert!(age >= lookahead, "row labelled before its lookahead elapsed");
                        if let Some(previous) = seen.insert(row.timestamp, label) {
                            prop_assert_eq!(previous, label);
                        }
                    }
                    None => prop_assert!(age < lookahead),
                }
            }
        }
    }
}

// ── 3. Scaler statistics ─────────────────────────────────────────────

proptest! {
    #[test]
    fn running_mean_matches_batch_mean(values in prop::collection::vec(-1e3..1e3_f64, 2..200)) {
        let mut scaler = WelfordScaler::new();
        for v in &values {
            scaler.transform(&[*v], true).unwrap();
        }
        let batch = values.iter().sum::<f64>() / values.len() as f64;
        prop_assert!((scaler.mean()[0] - batch).abs() < 1e-6);
        prop_assert_eq!(scaler.count(), values.len() as u64);
    }
}

// ── 4. Daily drawdown guard ──────────────────────────────────────────

proptest! {
    #[test]
    fn breached_day_refuses_every_open(
        loss_pct in 5.0..50.0_f64,
        hour in 1u32..23,
        symbol in "[A-Z]{6}",
        long in any::<bool>(),
    ) {
        let mut rm = RiskManager::new(RiskParameters::default()).unwrap();
        let day = start();
        rm.update_equity(10_000.0, day);
        rm.update_equity(10_000.0 * (1.0 - loss_pct / 100.0), day + Duration::hours(hour as i64));

        let direction = if long { Direction::Long } else { Direction::Short };
        prop_assert!(!rm.can_open(&symbol, &[], day + Duration::hours(hour as i64), direction, None));

        rm.update_equity(10_000.0 * (1.0 - loss_pct / 100.0), day + Duration::days(1));
        prop_assert!(rm.can_open(&symbol, &[], day + Duration::days(1), direction, None));
    }
}
