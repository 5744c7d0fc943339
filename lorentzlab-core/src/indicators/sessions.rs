//! Daily and weekly high/low context.
//!
//! Days are UTC calendar dates; weeks are ISO (year, week) pairs. When a bar
//! crosses a boundary, the period that just closed becomes the "previous"
//! range for every following bar until the next boundary.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Session levels as seen by one bar (the bar itself included).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionLevels {
    pub daily_high: Option<f64>,
    pub daily_low: Option<f64>,
    pub weekly_high: Option<f64>,
    pub weekly_low: Option<f64>,
    pub prev_day_high: Option<f64>,
    pub prev_day_low: Option<f64>,
    pub prev_week_high: Option<f64>,
    pub prev_week_low: Option<f64>,
}

#[derive(Debug, Clone)]
struct PeriodRange<K> {
    key: Option<K>,
    high: f64,
    low: f64,
    previous: Option<(f64, f64)>,
}

impl<K: PartialEq + Copy> PeriodRange<K> {
    fn new() -> Self {
        Self {
            key: None,
            high: f64::NEG_INFINITY,
            low: f64::INFINITY,
            previous: None,
        }
    }

    fn update(&mut self, key: K, high: f64, low: f64) {
        match self.key {
            Some(current) if current == key => {
                self.high = self.high.max(high);
                self.low = self.low.min(low);
            }
            Some(_) => {
                self.previous = Some((self.high, self.low));
                self.key = Some(key);
                self.high = high;
                self.low = low;
            }
            None => {
                self.key = Some(key);
                self.high = high;
                self.low = low;
            }
        }
    }

    fn current(&self) -> (Option<f64>, Option<f64>) {
        match self.key {
            Some(_) => (Some(self.high), Some(self.low)),
            None => (None, None),
        }
    }
}

/// Running daily/weekly high-low tracker.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    day: PeriodRange<NaiveDate>,
    week: PeriodRange<(i32, u32)>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTracker {
    pub fn new() -> Self {
        Self {
            day: PeriodRange::new(),
            week: PeriodRange::new(),
        }
    }

    /// Fold one bar into the running ranges and return the levels it sees.
    pub fn update(&mut self, timestamp: DateTime<Utc>, high: f64, low: f64) -> SessionLevels {
        let date = timestamp.date_naive();
        let iso = date.iso_week();

        self.day.update(date, high, low);
        self.week.update((iso.year(), iso.week()), high, low);

        let (daily_high, daily_low) = self.day.current();
        let (weekly_high, weekly_low) = self.week.current();

        SessionLevels {
            daily_high,
            daily_low,
            weekly_high,
            weekly_low,
            prev_day_high: self.day.previous.map(|(h, _)| h),
            prev_day_low: self.day.previous.map(|(_, l)| l),
            prev_week_high: self.week.previous.map(|(h, _)| h),
            prev_week_low: self.week.previous.map(|(_, l)| l),
        }
    }
}
