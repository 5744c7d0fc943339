//! Heartbeat sink that logs through `tracing` and keeps a history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CollaboratorError, HealthMonitor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub details: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Default)]
pub struct TracingHealthMonitor {
    history: Vec<Heartbeat>,
    /// Oldest heartbeats are dropped beyond this; `None` keeps everything.
    max_history: Option<usize>,
}

impl TracingHealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            history: Vec::new(),
            max_history: Some(max_history),
        }
    }

    pub fn history(&self) -> &[Heartbeat] {
        &self.history
    }

    pub fn last(&self) -> Option<&Heartbeat> {
        self.history.last()
    }
}

impl HealthMonitor for TracingHealthMonitor {
    fn record_status(
        &mut self,
        status: &str,
        timestamp: DateTime<Utc>,
        details: &BTreeMap<String, serde_json::Value>,
    ) -> Result<(), CollaboratorError> {
        let details_json = serde_json::to_string(details)?;
        tracing::info!(status, %timestamp, details = %details_json, "heartbeat");

        self.history.push(Heartbeat {
            status: status.to_string(),
            timestamp,
            details: details.clone(),
        });
        if let Some(max) = self.max_history {
            if self.history.len() > max {
                let excess = self.history.len() - max;
                self.history.drain(..excess);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn keeps_bounded_history() {
        let mut monitor = TracingHealthMonitor::with_max_history(2);
        let ts = Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap();
        for i in 0..3 {
            let details = BTreeMap::from([("decisions".to_string(), serde_json::json!(i))]);
            monitor.record_status("ok", ts, &details).unwrap();
        }
        assert_eq!(monitor.history().len(), 2);
        assert_eq!(monitor.last().unwrap().details["decisions"], serde_json::json!(2));
    }
}
