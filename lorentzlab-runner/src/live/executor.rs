//! RealtimeExecutor: drives TradeLogic from a live snapshot feed.
//!
//! Per snapshot:
//! 1. Fetch open positions from the broker (fall back to the cached list)
//! 2. Push account equity into the risk manager, run TradeLogic
//! 3. Execute each decision in isolation; mirror successes locally
//! 4. Persist the position list, emit a heartbeat
//!
//! Collaborator failures are logged and contained. Only TradeLogic errors
//! (bad snapshot data, broken transforms) reach the caller.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lorentzlab_core::domain::{ActivePosition, MarketSnapshot, TradeDecision};
use lorentzlab_core::{TradeLogic, TradeLogicError};

use super::{mirror_decision, BrokerConnector, HealthMonitor, StateStore};

/// Heartbeat status sent after every processed snapshot.
pub const STATUS_OK: &str = "ok";

/// Equity points kept by the risk manager while trading live.
pub const LIVE_EQUITY_CURVE_LIMIT: usize = 10_000;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("trade logic error: {0}")]
    Logic(#[from] TradeLogicError),
}

/// A decision the broker refused, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedDecision {
    pub decision: TradeDecision,
    pub error: String,
}

pub struct RealtimeExecutor<B, S, H> {
    logic: TradeLogic,
    broker: B,
    store: S,
    health: H,
    positions: Vec<ActivePosition>,
    last_failures: Vec<FailedDecision>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl<B, S, H> RealtimeExecutor<B, S, H>
where
    B: BrokerConnector,
    S: StateStore,
    H: HealthMonitor,
{
    pub fn new(mut logic: TradeLogic, broker: B, store: S, health: H) -> Self {
        logic
            .risk_mut()
            .set_equity_curve_limit(Some(LIVE_EQUITY_CURVE_LIMIT));
        Self {
            logic,
            broker,
            store,
            health,
            positions: Vec::new(),
            last_failures: Vec::new(),
            last_timestamp: None,
        }
    }

    /// Seed the cached position list from the state store. Load failures are
    /// logged and leave the list empty. Returns the number of positions loaded.
    pub fn restore(&mut self) -> usize {
        match self.store.load() {
            Ok(positions) => {
                tracing::info!(positions = positions.len(), "restored positions from state store");
                self.positions = positions;
            }
            Err(err) => {
                tracing::warn!(error = %err, "state store load failed, starting with no positions");
                self.positions.clear();
            }
        }
        self.positions.len()
    }

    /// Process one live snapshot and return the decisions TradeLogic made,
    /// whether or not the broker accepted them. See [`Self::last_failures`].
    ///
    /// Snapshots not newer than the last one TradeLogic accepted are skipped.
    pub fn process_snapshot(
        &mut self,
        snapshot: &MarketSnapshot,
        account_equity: Option<f64>,
    ) -> Result<Vec<TradeDecision>, ExecutorError> {
        let span = tracing::info_span!(
            "live_snapshot",
            symbol = %snapshot.symbol,
            timestamp = %snapshot.timestamp
        );
        let _enter = span.enter();

        if let Some(previous) = self.last_timestamp {
            if snapshot.timestamp <= previous {
                tracing::warn!(%previous, "snapshot is not newer than the last one, skipping");
                return Ok(Vec::new());
            }
        }
        self.last_failures.clear();

        match self.broker.fetch_open_positions() {
            Ok(positions) => self.positions = positions,
            Err(err) => tracing::warn!(
                error = %err,
                cached = self.positions.len(),
                "position fetch failed, using cached positions"
            ),
        }

        if let Some(equity) = account_equity {
            self.logic.risk_mut().update_equity(equity, snapshot.timestamp);
        }
        let decisions = self.logic.on_bar(snapshot, &self.positions, account_equity)?;
        self.last_timestamp = Some(snapshot.timestamp);

        for decision in &decisions {
            match self.broker.execute(decision) {
                Ok(()) => {
                    if !mirror_decision(&mut self.positions, decision) {
                        tracing::warn!(
                            action = ?decision.action,
                            side = ?decision.direction,
                            "executed decision had no matching local position"
                        );
                    }
                    tracing::info!(
                        action = ?decision.action,
                        side = ?decision.direction,
                        size = decision.size,
                        price = decision.price,
                        reason = decision.reason.as_str(),
                        "decision executed"
                    );
                }
                Err(err) => {
                    tracing::error!(
                        action = ?decision.action,
                        side = ?decision.direction,
                        error = %err,
                        "decision execution failed"
                    );
                    self.last_failures.push(FailedDecision {
                        decision: decision.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        if let Err(err) = self.store.save(&self.positions) {
            tracing::error!(error = %err, "failed to persist positions");
        }

        let details = BTreeMap::from([
            ("decisions".to_string(), serde_json::json!(decisions.len())),
            ("failed".to_string(), serde_json::json!(self.last_failures.len())),
            ("open_positions".to_string(), serde_json::json!(self.positions.len())),
            ("symbol".to_string(), serde_json::json!(snapshot.symbol)),
        ]);
        if let Err(err) = self
            .health
            .record_status(STATUS_OK, snapshot.timestamp, &details)
        {
            tracing::warn!(error = %err, "heartbeat failed");
        }

        Ok(decisions)
    }

    pub fn positions(&self) -> &[ActivePosition] {
        &self.positions
    }

    /// Decisions the broker rejected while processing the latest snapshot.
    pub fn last_failures(&self) -> &[FailedDecision] {
        &self.last_failures
    }

    pub fn logic(&self) -> &TradeLogic {
        &self.logic
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut B {
        &mut self.broker
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn health(&self) -> &H {
        &self.health
    }

    pub fn into_parts(self) -> (TradeLogic, B, S, H) {
        (self.logic, self.broker, self.store, self.health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::test_support::snapshot;
    use crate::live::{CollaboratorError, MemoryStateStore, PaperBroker, TracingHealthMonitor};
    use lorentzlab_core::domain::{DecisionAction, Side};
    use lorentzlab_core::risk::RiskParameters;
    use lorentzlab_core::TradeConfig;

    fn logic() -> TradeLogic {
        let config = TradeConfig {
            neighbors: 1,
            label_lookahead: 1,
            neutral_zone_pips: 0.0,
            ..TradeConfig::default()
        };
        TradeLogic::new(config, RiskParameters::default()).unwrap()
    }

    fn executor(
        broker: PaperBroker,
        store: MemoryStateStore,
    ) -> RealtimeExecutor<PaperBroker, MemoryStateStore, TracingHealthMonitor> {
        RealtimeExecutor::new(logic(), broker, store, TracingHealthMonitor::new())
    }

    #[test]
    fn heartbeat_and_save_on_every_snapshot() {
        let mut ex = executor(PaperBroker::new(), MemoryStateStore::new());
        ex.process_snapshot(&snapshot(0, 1.1000), Some(10_000.0)).unwrap();
        ex.process_snapshot(&snapshot(1, 1.1010), Some(10_000.0)).unwrap();

        assert_eq!(ex.store().save_count(), 2);
        assert_eq!(ex.health().history().len(), 2);
        let beat = ex.health().last().unwrap();
        assert_eq!(beat.status, STATUS_OK);
        assert_eq!(beat.details["decisions"], serde_json::json!(1));
        assert_eq!(beat.details["open_positions"], serde_json::json!(1));
        assert_eq!(ex.positions()[0].direction, Side::Long);
        assert_eq!(ex.store().positions().len(), 1);
    }

    #[test]
    fn failed_execution_is_isolated() {
        let mut ex = executor(
            PaperBroker::new().fail_on(DecisionAction::Open),
            MemoryStateStore::new(),
        );
        ex.process_snapshot(&snapshot(0, 1.1000), None).unwrap();
        let decisions = ex.process_snapshot(&snapshot(1, 1.1010), None).unwrap();

        assert_eq!(decisions.len(), 1);
        assert_eq!(ex.last_failures().len(), 1);
        assert!(ex.positions().is_empty());
        assert_eq!(ex.health().last().unwrap().details["failed"], serde_json::json!(1));
    }

    #[test]
    fn fetch_failure_falls_back_to_cache() {
        let mut ex = executor(PaperBroker::new(), MemoryStateStore::new());
        ex.process_snapshot(&snapshot(0, 1.1000), None).unwrap();
        ex.process_snapshot(&snapshot(1, 1.1010), None).unwrap();
        assert_eq!(ex.positions().len(), 1);

        ex.broker_mut().set_fetch_failure(true);
        ex.process_snapshot(&snapshot(2, 1.1020), None).unwrap();
        // Cached long kept, a second long opened under the symbol cap of 2.
        assert_eq!(ex.positions().len(), 2);
    }

    #[test]
    fn stale_snapshot_is_skipped() {
        let mut ex = executor(PaperBroker::new(), MemoryStateStore::new());
        ex.process_snapshot(&snapshot(5, 1.1000), None).unwrap();
        assert!(ex.process_snapshot(&snapshot(4, 1.2000), None).unwrap().is_empty());
        assert_eq!(ex.health().history().len(), 1);
        assert_eq!(ex.logic().strategy().len(), 1);
    }

    #[test]
    fn restore_loads_saved_positions() {
        let mut store = MemoryStateStore::new();
        let mut seed = Vec::new();
        mirror_decision(
            &mut seed,
            &crate::live::test_support::decision(DecisionAction::Open, Side::Short),
        );
        store.save(&seed).unwrap();

        let mut ex = executor(PaperBroker::new(), store);
        assert_eq!(ex.restore(), 1);
        assert_eq!(ex.positions()[0].direction, Side::Short);
    }

    #[test]
    fn snapshot_rejected_by_logic_can_be_retried() {
        let mut ex = executor(PaperBroker::new(), MemoryStateStore::new());
        let mut bad = snapshot(0, 1.1000);
        bad.pip_size = 0.0;
        assert!(matches!(
            ex.process_snapshot(&bad, None),
            Err(ExecutorError::Logic(_))
        ));
        assert_eq!(ex.store().save_count(), 0);
        assert!(ex.health().history().is_empty());

        ex.process_snapshot(&snapshot(0, 1.1000), None).unwrap();
        assert_eq!(ex.store().save_count(), 1);
        assert_eq!(ex.health().history().len(), 1);
        assert_eq!(ex.logic().strategy().len(), 1);
    }

    #[test]
    fn live_equity_curve_is_bounded() {
        let config = TradeConfig {
            max_rows: 16,
            ..TradeConfig::default()
        };
        let logic = TradeLogic::new(config, RiskParameters::default()).unwrap();
        let mut ex = RealtimeExecutor::new(
            logic,
            PaperBroker::new(),
            MemoryStateStore::new(),
            TracingHealthMonitor::new(),
        );
        let total = LIVE_EQUITY_CURVE_LIMIT + 25;
        for i in 0..total {
            let equity = if i == 3 { 9_000.0 } else { 10_000.0 };
            ex.process_snapshot(&snapshot(i as i64, 1.1000), Some(equity))
                .unwrap();
        }
        let performance = ex.logic().risk().performance();
        assert_eq!(performance.equity_curve.len(), LIVE_EQUITY_CURVE_LIMIT);
        assert!((performance.max_drawdown_pct - 10.0).abs() < 1e-9);
    }

    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn load(&self) -> Result<Vec<ActivePosition>, CollaboratorError> {
            Err(CollaboratorError::State("offline".into()))
        }

        fn save(&mut self, _: &[ActivePosition]) -> Result<(), CollaboratorError> {
            Err(CollaboratorError::State("offline".into()))
        }
    }

    #[test]
    fn store_failures_do_not_abort() {
        let mut ex = RealtimeExecutor::new(
            logic(),
            PaperBroker::new(),
            BrokenStore,
            TracingHealthMonitor::new(),
        );
        assert_eq!(ex.restore(), 0);
        ex.process_snapshot(&snapshot(0, 1.1000), None).unwrap();
        let decisions = ex.process_snapshot(&snapshot(1, 1.1010), None).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(ex.health().history().len(), 2);
    }
}
