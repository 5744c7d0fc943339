//! Lorentzian k-NN classifier with self-labelling.

use chrono::{DateTime, Utc};

use super::ring::RowRing;
use super::{KnnConfig, StrategyError};
use crate::domain::{Direction, MarketSnapshot, TradeSignal};
use crate::features::{
    DistanceMetric, FeatureTransform, Lorentzian, ScalerState, WelfordScaler,
};

/// One transformed sample in the learning window.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub features: Vec<f64>,
    pub close: f64,
    pub timestamp: DateTime<Utc>,
    label: Option<i8>,
}

impl FeatureRow {
    /// Label in {-1, 0, +1}, once assigned.
    pub fn label(&self) -> Option<i8> {
        self.label
    }
}

pub struct LorentzianKnnStrategy {
    config: KnnConfig,
    transform: Box<dyn FeatureTransform>,
    metric: Box<dyn DistanceMetric>,
    rows: RowRing<FeatureRow>,
    labeled: usize,
    /// (distance, label) buffer reused across bars.
    scratch: Vec<(f64, i8)>,
}

impl std::fmt::Debug for LorentzianKnnStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LorentzianKnnStrategy")
            .field("config", &self.config)
            .field("transform", &self.transform.name())
            .field("metric", &self.metric.name())
            .field("rows", &self.rows.len())
            .field("labeled", &self.labeled)
            .finish()
    }
}

impl LorentzianKnnStrategy {
    /// Strategy with the default Welford scaler and Lorentzian distance.
    pub fn new(config: KnnConfig) -> Result<Self, StrategyError> {
        Self::with_components(config, Box::new(WelfordScaler::new()), Box::new(Lorentzian))
    }

    pub fn with_components(
        config: KnnConfig,
        transform: Box<dyn FeatureTransform>,
        metric: Box<dyn DistanceMetric>,
    ) -> Result<Self, StrategyError> {
        config.validate()?;
        Ok(Self {
            config,
            transform,
            metric,
            rows: RowRing::with_capacity(config.max_rows),
            labeled: 0,
            scratch: Vec::with_capacity(config.max_rows),
        })
    }

    pub fn config(&self) -> &KnnConfig {
        &self.config
    }

    /// Rows currently in the window.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in the window that carry a label.
    pub fn labeled_len(&self) -> usize {
        self.labeled
    }

    /// Window rows, oldest first.
    pub fn rows(&self) -> impl Iterator<Item = &FeatureRow> + '_ {
        self.rows.iter()
    }

    pub fn export_scaler_state(&self) -> Option<ScalerState> {
        self.transform.export_state()
    }

    pub fn import_scaler_state(&mut self, state: ScalerState) -> Result<(), StrategyError> {
        self.transform.import_state(state)?;
        Ok(())
    }

    /// Consume one snapshot: learn from it, label the row whose lookahead
    /// just matured, and classify the new bar.
    ///
    /// Returns `None` until at least `neighbors` labelled rows exist. A
    /// snapshot with a NaN or infinite feature is refused before it reaches
    /// the transform, leaving the window and scaler untouched.
    pub fn update(
        &mut self,
        snapshot: &MarketSnapshot,
    ) -> Result<Option<TradeSignal>, StrategyError> {
        if !(snapshot.pip_size > 0.0) {
            return Err(StrategyError::InvalidPipSize {
                symbol: snapshot.symbol.clone(),
                pip_size: snapshot.pip_size,
            });
        }

        let raw = snapshot.feature_vector();
        if let Some((index, &value)) = raw.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(StrategyError::NonFiniteFeature {
                symbol: snapshot.symbol.clone(),
                index,
                value,
            });
        }

        let features = self.transform.transform(&raw, true)?;
        let row = FeatureRow {
            features,
            close: snapshot.close,
            timestamp: snapshot.timestamp,
            label: None,
        };
        if let Some(evicted) = self.rows.push(row) {
            if evicted.label.is_some() {
                self.labeled -= 1;
            }
        }

        self.label_matured_row(snapshot.close, snapshot.pip_size);
        Ok(self.classify_newest())
    }

    fn label_matured_row(&mut self, close_now: f64, pip_size: f64) {
        let lookahead = self.config.label_lookahead;
        let Some(index) = self.rows.len().checked_sub(lookahead + 1) else {
            return;
        };
        let neutral_zone = self.config.neutral_zone_pips;
        let Some(row) = self.rows.get_mut(index) else {
            return;
        };
        if row.label.is_some() {
            return;
        }

        let change = close_now - row.close;
        let move_pips = change.abs() / pip_size;
        let label = if move_pips < neutral_zone {
            0
        } else if change > 0.0 {
            1
        } else if change < 0.0 {
            -1
        } else {
            0
        };
        row.label = Some(label);
        self.labeled += 1;
    }

    /// Vote among labelled rows, never consulting the newest (current) row.
    fn classify_newest(&mut self) -> Option<TradeSignal> {
        let k = self.config.neighbors;
        let newest = self.rows.last()?;
        let history = self.rows.len() - 1;
        let available = self.labeled - usize::from(newest.label.is_some());
        if available < k {
            return None;
        }

        self.scratch.clear();
        for row in self.rows.iter().take(history) {
            if let Some(label) = row.label {
                let d = self.metric.distance(&newest.features, &row.features);
                self.scratch.push((d, label));
            }
        }
        self.scratch.sort_by(|a, b| a.0.total_cmp(&b.0));

        let vote: i64 = self.scratch.iter().take(k).map(|&(_, l)| i64::from(l)).sum();
        if vote == 0 {
            return Some(TradeSignal::neutral(k));
        }
        Some(TradeSignal {
            direction: Direction::from_sign(vote),
            confidence: vote.unsigned_abs() as f64 / k as f64,
            vote,
            neighbors_considered: k,
        })
    }
}
