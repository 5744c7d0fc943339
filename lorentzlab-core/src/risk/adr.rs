//! Rolling Average Daily Range (ADR) in pips.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::VecDeque;

use super::RiskError;

/// Keeps one range per UTC calendar day; later bars of a day already
/// recorded are ignored.
#[derive(Debug, Clone)]
pub struct AdrTracker {
    period: usize,
    ranges: VecDeque<f64>,
    last_day: Option<NaiveDate>,
}

impl AdrTracker {
    pub fn new(period: usize) -> Result<Self, RiskError> {
        if period == 0 {
            return Err(RiskError::InvalidConfig("adr_period must be >= 1".into()));
        }
        Ok(Self {
            period,
            ranges: VecDeque::with_capacity(period),
            last_day: None,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Record the day's range. Returns true if a new entry was added.
    pub fn update(&mut self, timestamp: DateTime<Utc>, high: f64, low: f64, pip_size: f64) -> bool {
        let day = timestamp.date_naive();
        if self.last_day == Some(day) || !(pip_size > 0.0) {
            return false;
        }
        self.last_day = Some(day);

        self.ranges.push_back((high - low).abs() / pip_size);
        while self.ranges.len() > self.period {
            self.ranges.pop_front();
        }
        true
    }

    /// Simple mean of the window, if any day has been recorded.
    pub fn value(&self) -> Option<f64> {
        if self.ranges.is_empty() {
            return None;
        }
        Some(self.ranges.iter().sum::<f64>() / self.ranges.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
