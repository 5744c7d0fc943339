//! Integration tests for the live loop: partial failure isolation, fallback
//! on broker outages, and persistence across restarts.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use lorentzlab_core::domain::{
    ActivePosition, DecisionAction, MarketSnapshot, Side, SnapshotContext,
};
use lorentzlab_core::risk::RiskParameters;
use lorentzlab_core::{TradeConfig, TradeLogic};
use lorentzlab_runner::live::{
    CollaboratorError, HealthMonitor, JsonFileStateStore, MemoryStateStore, PaperBroker,
    RealtimeExecutor, StateStore, TracingHealthMonitor,
};

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap()
}

fn snapshot(i: i64, close: f64) -> MarketSnapshot {
    MarketSnapshot {
        symbol: "EURUSD".into(),
        timestamp: start() + Duration::minutes(15 * i),
        open: close,
        high: close,
        low: close,
        close,
        rsi_fast: 48.0,
        adx_fast: 18.0,
        rsi_slow: 51.0,
        adx_slow: 21.0,
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

fn logic() -> TradeLogic {
    let config = TradeConfig {
        neighbors: 1,
        label_lookahead: 1,
        neutral_zone_pips: 0.0,
        ..TradeConfig::default()
    };
    TradeLogic::new(config, RiskParameters::default()).unwrap()
}

fn held_long() -> ActivePosition {
    ActivePosition {
        symbol: "EURUSD".into(),
        direction: Side::Long,
        size: 0.2,
        entry_price: 1.1050,
        stop_loss: None,
        take_profit: None,
        opened_at: start() - Duration::hours(1),
    }
}

/// Records every save call.
#[derive(Default)]
struct RecordingStore {
    saves: Vec<Vec<ActivePosition>>,
}

impl StateStore for RecordingStore {
    fn load(&self) -> Result<Vec<ActivePosition>, CollaboratorError> {
        Ok(self.saves.last().cloned().unwrap_or_default())
    }

    fn save(&mut self, positions: &[ActivePosition]) -> Result<(), CollaboratorError> {
        self.saves.push(positions.to_vec());
        Ok(())
    }
}

struct FailingMonitor;

impl HealthMonitor for FailingMonitor {
    fn record_status(
        &mut self,
        _: &str,
        _: DateTime<Utc>,
        _: &BTreeMap<String, serde_json::Value>,
    ) -> Result<(), CollaboratorError> {
        Err(CollaboratorError::Health("monitor down".into()))
    }
}

#[test]
fn failed_close_does_not_block_open_and_state_is_saved_once() {
    let broker = PaperBroker::with_positions(vec![held_long()]).fail_on(DecisionAction::Close);
    let mut ex = RealtimeExecutor::new(
        logic(),
        broker,
        RecordingStore::default(),
        TracingHealthMonitor::new(),
    );

    ex.process_snapshot(&snapshot(0, 1.1000), Some(10_000.0)).unwrap();
    let saves_before = ex.store().saves.len();
    let decisions = ex.process_snapshot(&snapshot(1, 1.0990), Some(10_000.0)).unwrap();

    // Falling close: reverse the long, open a short.
    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0].action, DecisionAction::Close);
    assert_eq!(decisions[1].action, DecisionAction::Open);
    assert_eq!(decisions[1].direction, Side::Short);

    assert_eq!(ex.last_failures().len(), 1);
    assert_eq!(ex.last_failures()[0].decision.action, DecisionAction::Close);

    assert_eq!(ex.store().saves.len(), saves_before + 1);
    let saved = ex.store().saves.last().unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].direction, Side::Long);
    assert_eq!(saved[1].direction, Side::Short);

    let beat = ex.health().last().unwrap();
    assert_eq!(beat.status, "ok");
    assert_eq!(beat.details["decisions"], serde_json::json!(2));
    assert_eq!(beat.details["failed"], serde_json::json!(1));
    assert_eq!(beat.details["symbol"], serde_json::json!("EURUSD"));
}

#[test]
fn heartbeat_failure_is_contained() {
    let mut ex = RealtimeExecutor::new(
        logic(),
        PaperBroker::new(),
        MemoryStateStore::new(),
        FailingMonitor,
    );
    ex.process_snapshot(&snapshot(0, 1.1000), None).unwrap();
    assert_eq!(ex.process_snapshot(&snapshot(1, 1.1010), None).unwrap().len(), 1);
    assert_eq!(ex.store().save_count(), 2);
}

#[test]
fn daily_drawdown_blocks_live_entries() {
    let mut ex = RealtimeExecutor::new(
        logic(),
        PaperBroker::new(),
        MemoryStateStore::new(),
        TracingHealthMonitor::new(),
    );
    ex.process_snapshot(&snapshot(0, 1.1000), Some(10_000.0)).unwrap();
    // 6% below the day's opening equity.
    let decisions = ex.process_snapshot(&snapshot(1, 1.1010), Some(9_400.0)).unwrap();
    assert!(decisions.is_empty());
    assert!(ex.positions().is_empty());
}

#[test]
fn positions_survive_restart_via_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("positions.json");

    {
        let mut ex = RealtimeExecutor::new(
            logic(),
            PaperBroker::new(),
            JsonFileStateStore::new(&path),
            TracingHealthMonitor::new(),
        );
        ex.process_snapshot(&snapshot(0, 1.1000), None).unwrap();
        ex.process_snapshot(&snapshot(1, 1.1010), None).unwrap();
        assert_eq!(ex.positions().len(), 1);
    }

    let mut broker = PaperBroker::new();
    broker.set_fetch_failure(true);
    let mut restarted = RealtimeExecutor::new(
        logic(),
        broker,
        JsonFileStateStore::new(&path),
        TracingHealthMonitor::new(),
    );
    assert_eq!(restarted.restore(), 1);
    assert_eq!(restarted.positions()[0].direction, Side::Long);
    assert!((restarted.positions()[0].entry_price - 1.1010).abs() < 1e-12);

    // Broker offline: the restored list is what the logic sees and what is saved.
    restarted.process_snapshot(&snapshot(2, 1.1020), None).unwrap();
    let on_disk = JsonFileStateStore::new(&path).load().unwrap();
    assert_eq!(on_disk, restarted.positions());
}
