use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Side of an open position or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

/// An open position, owned by whichever harness is iterating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivePosition {
    pub symbol: String,
    pub direction: Side,
    pub size: f64,
    pub entry_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub opened_at: DateTime<Utc>,
}

impl ActivePosition {
    pub fn is_long(&self) -> bool {
        self.direction == Side::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Side::Short
    }

    /// Signed pip distance from entry, positive when the position is in profit.
    pub fn unrealized_pips(&self, price: f64, pip_size: f64) -> f64 {
        if pip_size <= 0.0 {
            return 0.0;
        }
        (price - self.entry_price) / pip_size * self.direction.sign()
    }

    pub fn unrealized_pnl(&self, price: f64, pip_size: f64, pip_value: f64) -> f64 {
        self.unrealized_pips(price, pip_size) * pip_value * self.size
    }
}
