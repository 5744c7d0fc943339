//! In-memory broker for paper trading and tests.

use std::collections::HashSet;

use lorentzlab_core::domain::{ActivePosition, DecisionAction, TradeDecision};

use super::{mirror_decision, BrokerConnector, CollaboratorError};

/// Fills every decision instantly at the decision price.
///
/// Failure injection: `fail_actions` makes every decision of those kinds fail,
/// `fail_fetches` makes position fetches fail.
#[derive(Debug, Default)]
pub struct PaperBroker {
    positions: Vec<ActivePosition>,
    executed: Vec<TradeDecision>,
    fail_actions: HashSet<DecisionAction>,
    fail_fetches: bool,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positions(positions: Vec<ActivePosition>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }

    pub fn fail_on(mut self, action: DecisionAction) -> Self {
        self.fail_actions.insert(action);
        self
    }

    pub fn set_fetch_failure(&mut self, fail: bool) {
        self.fail_fetches = fail;
    }

    pub fn positions(&self) -> &[ActivePosition] {
        &self.positions
    }

    /// Decisions that were executed successfully, in order.
    pub fn executed(&self) -> &[TradeDecision] {
        &self.executed
    }
}

impl BrokerConnector for PaperBroker {
    fn fetch_open_positions(&mut self) -> Result<Vec<ActivePosition>, CollaboratorError> {
        if self.fail_fetches {
            return Err(CollaboratorError::Broker("position fetch unavailable".into()));
        }
        Ok(self.positions.clone())
    }

    fn execute(&mut self, decision: &TradeDecision) -> Result<(), CollaboratorError> {
        if self.fail_actions.contains(&decision.action) {
            return Err(CollaboratorError::Broker(format!(
                "rejected {:?} {} {:?}",
                decision.action, decision.symbol, decision.direction
            )));
        }
        if !mirror_decision(&mut self.positions, decision) {
            return Err(CollaboratorError::Broker(format!(
                "no {:?} position on {} to {:?}",
                decision.direction, decision.symbol, decision.action
            )));
        }
        self.executed.push(decision.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::test_support::decision;
    use lorentzlab_core::domain::Side;

    #[test]
    fn executes_and_tracks_positions() {
        let mut broker = PaperBroker::new();
        broker.execute(&decision(DecisionAction::Open, Side::Short)).unwrap();
        assert_eq!(broker.fetch_open_positions().unwrap().len(), 1);
        broker.execute(&decision(DecisionAction::Close, Side::Short)).unwrap();
        assert!(broker.positions().is_empty());
        assert_eq!(broker.executed().len(), 2);
    }

    #[test]
    fn closing_nothing_is_an_error() {
        let mut broker = PaperBroker::new();
        assert!(broker.execute(&decision(DecisionAction::Close, Side::Long)).is_err());
        assert!(broker.executed().is_empty());
    }

    #[test]
    fn injected_failures() {
        let mut broker = PaperBroker::new().fail_on(DecisionAction::Open);
        assert!(broker.execute(&decision(DecisionAction::Open, Side::Long)).is_err());
        broker.set_fetch_failure(true);
        assert!(matches!(
            broker.fetch_open_positions(),
            Err(CollaboratorError::Broker(_))
        ));
    }
}
