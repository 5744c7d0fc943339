use serde::{Deserialize, Serialize};

/// Instrument metadata: pip size and the monetary value of one pip per
/// standard lot. Constant for the lifetime of a symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentMeta {
    pub symbol: String,
    pub pip_size: f64,
    pub pip_value: f64,
}

impl InstrumentMeta {
    pub fn new(symbol: impl Into<String>, pip_size: f64, pip_value: f64) -> Self {
        Self {
            symbol: symbol.into(),
            pip_size,
            pip_value,
        }
    }

    /// Convert a price distance into pips.
    pub fn to_pips(&self, price_distance: f64) -> f64 {
        if self.pip_size <= 0.0 {
            return 0.0;
        }
        price_distance / self.pip_size
    }

    /// Convert a pip distance into a price distance.
    pub fn to_price(&self, pips: f64) -> f64 {
        pips * self.pip_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pip_conversions() {
        let eurusd = InstrumentMeta::new("EURUSD", 0.0001, 10.0);
        assert!((eurusd.to_pips(0.0025) - 25.0).abs() < 1e-9);
        assert!((eurusd.to_price(25.0) - 0.0025).abs() < 1e-12);
    }

    #[test]
    fn degenerate_pip_size_yields_zero_pips() {
        let broken = InstrumentMeta::new("XXX", 0.0, 1.0);
        assert_eq!(broken.to_pips(1.0), 0.0);
    }
}
