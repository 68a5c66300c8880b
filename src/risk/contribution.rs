//! Decomposition of portfolio variance into per-asset contributions.
//!
//! $$
//! RC_i = \frac{w_i (\Sigma w)_i}{w' \Sigma w}
//! $$

use ndarray::Array2;
use serde::Serialize;

use crate::error::EngineError;

/// Per-asset share of portfolio variance under a weight vector.
#[derive(Debug, Clone, Serialize)]
pub struct RiskContribution {
  /// Marginal contribution `(Sigma w)_i`.
  pub marginal: Vec<f64>,
  /// Fractional contribution, summing to 1.
  pub contribution: Vec<f64>,
  /// Percentage contribution, summing to 100.
  pub percentage: Vec<f64>,
}

pub(crate) fn risk_contribution(
  weights: &[f64],
  cov: &Array2<f64>,
) -> Result<RiskContribution, EngineError> {
  let n = weights.len();
  let marginal: Vec<f64> = (0..n)
    .map(|i| (0..n).map(|j| cov[(i, j)] * weights[j]).sum())
    .collect();

  let total_variance: f64 = weights
    .iter()
    .zip(marginal.iter())
    .map(|(w, m)| w * m)
    .sum();
  if total_variance < 1e-15 {
    return Err(EngineError::Numerical(
      "portfolio variance is zero; risk contributions are undefined".to_string(),
    ));
  }

  let contribution: Vec<f64> = weights
    .iter()
    .zip(marginal.iter())
    .map(|(w, m)| w * m / total_variance)
    .collect();
  let percentage = contribution.iter().map(|c| c * 100.0).collect();

  Ok(RiskContribution {
    marginal,
    contribution,
    percentage,
  })
}
