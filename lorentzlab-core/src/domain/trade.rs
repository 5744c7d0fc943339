//! CompletedTrade: a closed round trip with realized P&L.

use super::position::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata key carrying the reason a trade was closed.
pub const EXIT_REASON_KEY: &str = "exit_reason";

/// A complete round-trip trade record: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedTrade {
    pub symbol: String,
    pub direction: Side,
    pub size: f64,

    pub entry_price: f64,
    pub exit_price: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,

    pub profit: f64,
    pub pips: f64,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CompletedTrade {
    pub fn is_winner(&self) -> bool {
        self.profit > 0.0
    }

    pub fn exit_reason(&self) -> Option<&str> {
        self.metadata.get(EXIT_REASON_KEY).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_trade() -> CompletedTrade {
        let mut metadata = BTreeMap::new();
        metadata.insert(EXIT_REASON_KEY.to_string(), "forced_exit".to_string());
        CompletedTrade {
            symbol: "EURUSD".into(),
            direction: Side::Long,
            size: 1.5,
            entry_price: 1.1000,
            exit_price: 1.1020,
            opened_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            closed_at: Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
            profit: 300.0,
            pips: 20.0,
            metadata,
        }
    }

    #[test]
    fn is_winner() {
        assert!(sample_trade().is_winner());
    }

    #[test]
    fn exit_reason_from_metadata() {
        assert_eq!(sample_trade().exit_reason(), Some("forced_exit"));
    }

    #[test]
    fn trade_serialization_roundtrip() {
        let trade = sample_trade();
        let json = serde_json::to_string(&trade).unwrap();
        let back: CompletedTrade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, back);
    }
}
