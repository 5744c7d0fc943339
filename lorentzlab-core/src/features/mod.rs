//! Feature pipeline: online normalization and the distance metric.
//!
//! Both are capabilities injected into the strategy at construction:
//! - [`FeatureTransform`]: vector in, normalized vector out (stateful)
//! - [`DistanceMetric`]: two vectors in, scalar distance out (stateless)
//!
//! The defaults are [`WelfordScaler`] and [`Lorentzian`].

pub mod distance;
pub mod scaler;

pub use distance::{Lorentzian, Manhattan};
pub use scaler::{ScalerState, WelfordScaler};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid scaler state: {0}")]
    InvalidState(String),
}

/// Online feature normalizer.
///
/// # Contract
/// - The first call fixes the dimensionality; later calls with a different
///   length fail with [`FeatureError::DimensionMismatch`].
/// - The output is computed from the statistics *before* this observation;
///   statistics are updated afterwards only when `update` is true.
pub trait FeatureTransform: Send + Sync {
    fn transform(&mut self, features: &[f64], update: bool) -> Result<Vec<f64>, FeatureError>;

    /// Dimensionality fixed by the first observation, if any.
    fn dimension(&self) -> Option<usize>;

    /// Persistable state, for transforms that carry any.
    fn export_state(&self) -> Option<ScalerState> {
        None
    }

    fn import_state(&mut self, _state: ScalerState) -> Result<(), FeatureError> {
        Err(FeatureError::InvalidState(
            "transform does not support state import".into(),
        ))
    }

    /// Name for logging.
    fn name(&self) -> &str;
}

/// Distance between two equal-length feature vectors.
pub trait DistanceMetric: Send + Sync {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// Name for logging.
    fn name(&self) -> &str;
}
