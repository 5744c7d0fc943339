//! Domain types for LorentzLab

pub mod bar;
pub mod decision;
pub mod instrument;
pub mod position;
pub mod snapshot;
pub mod trade;

pub use bar::RawBar;
pub use decision::{DecisionAction, DecisionReason, Direction, TradeDecision, TradeSignal};
pub use instrument::InstrumentMeta;
pub use position::{ActivePosition, Side};
pub use snapshot::{MarketSnapshot, SnapshotContext, FEATURE_COUNT};
pub use trade::{CompletedTrade, EXIT_REASON_KEY};

/// Symbol type alias
pub type Symbol = String;
