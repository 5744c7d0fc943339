//! Distance metrics for the k-NN classifier.

use super::DistanceMetric;

/// Lorentzian distance: `Σ ln(1 + |aᵢ − bᵢ|)`.
///
/// Grows sub-linearly with per-dimension gaps, so a single outlying feature
/// cannot dominate the neighbourhood the way it does under Euclidean distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lorentzian;

impl DistanceMetric for Lorentzian {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).abs().ln_1p())
            .sum()
    }

    fn name(&self) -> &str {
        "lorentzian"
    }
}

/// Plain L1 distance, kept as an alternative metric for comparisons.
#[derive(Debug, Clone, Copy, Default)]
pub struct Manhattan;

impl DistanceMetric for Manhattan {
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
    }

    fn name(&self) -> &str {
        "manhattan"
    }
}
