//! Signals and decisions: the engine's per-bar outputs.

use super::position::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classifier output direction. Maps onto the label space {-1, 0, +1}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
    Neutral,
}

impl Direction {
    /// Direction from the sign of a vote or price change.
    pub fn from_sign(value: i64) -> Self {
        match value.signum() {
            1 => Direction::Long,
            -1 => Direction::Short,
            _ => Direction::Neutral,
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
            Direction::Neutral => 0,
        }
    }

    /// The position side this direction would open, if any.
    pub fn side(self) -> Option<Side> {
        match self {
            Direction::Long => Some(Side::Long),
            Direction::Short => Some(Side::Short),
            Direction::Neutral => None,
        }
    }
}

impl From<Side> for Direction {
    fn from(side: Side) -> Self {
        match side {
            Side::Long => Direction::Long,
            Side::Short => Direction::Short,
        }
    }
}

/// One classification produced by the strategy for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub direction: Direction,
    /// `|vote| / neighbors_considered`, in [0, 1].
    pub confidence: f64,
    pub vote: i64,
    pub neighbors_considered: usize,
}

impl TradeSignal {
    /// A tied vote: present, but with no direction and zero confidence.
    pub fn neutral(neighbors_considered: usize) -> Self {
        Self {
            direction: Direction::Neutral,
            confidence: 0.0,
            vote: 0,
            neighbors_considered,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Open,
    Close,
    /// Adjust stop/take of an existing position. Consumed by the harnesses,
    /// not produced by `TradeLogic`.
    Modify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    KnnSignal,
    ReverseSignal,
    ForcedExit,
    ManualClose,
    StopAdjustment,
}

impl DecisionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::KnnSignal => "knn_signal",
            DecisionReason::ReverseSignal => "reverse_signal",
            DecisionReason::ForcedExit => "forced_exit",
            DecisionReason::ManualClose => "manual_close",
            DecisionReason::StopAdjustment => "stop_adjustment",
        }
    }
}

/// Immutable instruction emitted for one bar.
///
/// For `Close` decisions `direction` and `size` describe the position being
/// closed and `price` is the exit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDecision {
    pub action: DecisionAction,
    pub symbol: String,
    pub direction: Side,
    pub size: f64,
    pub price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub reason: DecisionReason,
    pub signal: Option<TradeSignal>,
    pub timestamp: DateTime<Utc>,
}

impl TradeDecision {
    pub fn is_open(&self) -> bool {
        self.action == DecisionAction::Open
    }

    pub fn is_close(&self) -> bool {
        self.action == DecisionAction::Close
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_from_sign() {
        assert_eq!(Direction::from_sign(3), Direction::Long);
        assert_eq!(Direction::from_sign(-2), Direction::Short);
        assert_eq!(Direction::from_sign(0), Direction::Neutral);
    }

    #[test]
    fn neutral_direction_has_no_side() {
        assert_eq!(Direction::Neutral.side(), None);
        assert_eq!(Direction::Short.side(), Some(Side::Short));
        assert_eq!(Direction::from(Side::Long).as_i8(), 1);
    }

    #[test]
    fn neutral_signal_is_zero_confidence() {
        let sig = TradeSignal::neutral(4);
        assert_eq!(sig.direction, Direction::Neutral);
        assert_eq!(sig.confidence, 0.0);
        assert_eq!(sig.neighbors_considered, 4);
    }

    #[test]
    fn reason_serializes_snake_case() {
        let json = serde_json::to_string(&DecisionReason::ReverseSignal).unwrap();
        assert_eq!(json, "\"reverse_signal\"");
        assert_eq!(DecisionReason::ForcedExit.as_str(), "forced_exit");
    }
}
