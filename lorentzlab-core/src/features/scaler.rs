//! Streaming standardization with Welford's algorithm.

use serde::{Deserialize, Serialize};

use super::{FeatureError, FeatureTransform};

/// Variance below this is treated as zero (std falls back to 1).
const VARIANCE_EPSILON: f64 = 1e-12;

/// Persistable running statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub count: u64,
    pub mean: Vec<f64>,
    /// Sum of squared deviations from the running mean, per dimension.
    pub m2: Vec<f64>,
}

/// Per-dimension running mean/variance; outputs `(x - mean) / std`.
#[derive(Debug, Clone, Default)]
pub struct WelfordScaler {
    dimension: Option<usize>,
    count: u64,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl WelfordScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Sample standard deviation per dimension (1.0 when undefined or ~0).
    pub fn std(&self) -> Vec<f64> {
        self.m2
            .iter()
            .map(|&m2| {
                if self.count <= 1 {
                    return 1.0;
                }
                let var = m2 / (self.count - 1) as f64;
                if var < VARIANCE_EPSILON {
                    1.0
                } else {
                    var.sqrt()
                }
            })
            .collect()
    }

    fn check_dimension(&mut self, actual: usize) -> Result<(), FeatureError> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(FeatureError::DimensionMismatch { expected, actual })
            }
            Some(_) => Ok(()),
            None => {
                self.dimension = Some(actual);
                Ok(())
            }
        }
    }

    fn observe(&mut self, features: &[f64]) {
        if self.count == 0 {
            self.mean = features.to_vec();
            self.m2 = vec![0.0; features.len()];
            self.count = 1;
            return;
        }

        self.count += 1;
        let n = self.count as f64;
        for (i, &x) in features.iter().enumerate() {
            let delta = x - self.mean[i];
            self.mean[i] += delta / n;
            let delta2 = x - self.mean[i];
            self.m2[i] += delta * delta2;
        }
    }
}

impl FeatureTransform for WelfordScaler {
    fn transform(&mut self, features: &[f64], update: bool) -> Result<Vec<f64>, FeatureError> {
        self.check_dimension(features.len())?;

        let out = if self.count == 0 {
            vec![0.0; features.len()]
        } else {
            let std = self.std();
            features
                .iter()
                .zip(self.mean.iter().zip(&std))
                .map(|(x, (mean, std))| (x - mean) / std)
                .collect()
        };

        if update {
            self.observe(features);
        }

        Ok(out)
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn export_state(&self) -> Option<ScalerState> {
        Some(ScalerState {
            count: self.count,
            mean: self.mean.clone(),
            m2: self.m2.clone(),
        })
    }

    fn import_state(&mut self, state: ScalerState) -> Result<(), FeatureError> {
        if state.mean.len() != state.m2.len() {
            return Err(FeatureError::InvalidState(format!(
                "mean has {} dimensions but m2 has {}",
                state.mean.len(),
                state.m2.len()
            )));
        }
        if state.count > 0 && state.mean.is_empty() {
            return Err(FeatureError::InvalidState(
                "non-zero count with empty statistics".into(),
            ));
        }

        self.dimension = if state.mean.is_empty() {
            None
        } else {
            Some(state.mean.len())
        };
        self.count = state.count;
        self.mean = state.mean;
        self.m2 = state.m2;
        Ok(())
    }

    fn name(&self) -> &str {
        "welford"
    }
}
