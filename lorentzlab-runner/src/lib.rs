//! LorentzLab Runner: harnesses around the decision engine.
//!
//! This crate builds on `lorentzlab-core` to provide:
//! - TOML configuration with defaults, validation and a content fingerprint
//! - Deterministic historical replay (`Backtester`, `run_backtest_from_bars`)
//! - The live loop (`RealtimeExecutor`) and its broker/state/health
//!   collaborators, with paper and file-backed implementations
//! - Tracing subscriber setup

pub mod backtest;
pub mod config;
pub mod live;
pub mod logging;

pub use backtest::{run_backtest_from_bars, BacktestError, BacktestResult, Backtester};
pub use config::{ConfigError, EngineConfig, LogFormat, RunId};
pub use live::{
    BrokerConnector, CollaboratorError, HealthMonitor, RealtimeExecutor, StateStore,
};
pub use logging::init_tracing;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<EngineConfig>();
        assert_sync::<EngineConfig>();
    }

    #[test]
    fn paper_executor_is_send() {
        assert_send::<
            RealtimeExecutor<live::PaperBroker, live::JsonFileStateStore, live::TracingHealthMonitor>,
        >();
    }
}
