//! Principal-component factor analysis of standardized returns.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use ndarray::Array2;
use serde::Serialize;

use crate::error::EngineError;
use crate::series::ReturnMatrix;
use crate::stats::sample_mean;
use crate::stats::sample_std;

/// Principal components of the standardized return panel.
#[derive(Debug, Clone, Serialize)]
pub struct FactorAnalysis {
  /// Number of reported components.
  pub components: usize,
  /// Variance share of each component, descending.
  pub explained_variance: Vec<f64>,
  /// Running sum of the variance shares.
  pub cumulative_variance: Vec<f64>,
  /// Per-symbol loadings, one entry per component.
  pub loadings: BTreeMap<String, Vec<f64>>,
}

pub(crate) fn principal_components(
  returns: &ReturnMatrix,
  max_components: usize,
) -> Result<FactorAnalysis, EngineError> {
  let n_obs = returns.n_observations();
  let n_assets = returns.n_assets();
  if n_obs < 2 {
    return Err(EngineError::Data(format!(
      "{n_obs} observations, need at least 2 for factor analysis"
    )));
  }

  // Zero-variance columns standardize to zero rather than dividing by zero,
  // so their loadings vanish.
  let mut standardized = Array2::zeros((n_obs, n_assets));
  for a in 0..n_assets {
    let col = returns.column(a).to_vec();
    let mean = sample_mean(&col);
    let std = sample_std(&col);
    if std < 1e-15 {
      continue;
    }
    for (t, x) in col.iter().enumerate() {
      standardized[(t, a)] = (x - mean) / std;
    }
  }

  let mut corr = DMatrix::zeros(n_assets, n_assets);
  for i in 0..n_assets {
    for j in i..n_assets {
      let mut acc = 0.0;
      for t in 0..n_obs {
        acc += standardized[(t, i)] * standardized[(t, j)];
      }
      let value = acc / (n_obs - 1) as f64;
      corr[(i, j)] = value;
      corr[(j, i)] = value;
    }
  }

  let eigen = corr.symmetric_eigen();
  let mut order: Vec<usize> = (0..n_assets).collect();
  order.sort_by(|&a, &b| {
    eigen.eigenvalues[b]
      .partial_cmp(&eigen.eigenvalues[a])
      .unwrap_or(std::cmp::Ordering::Equal)
  });

  let total: f64 = eigen.eigenvalues.iter().map(|l| l.max(0.0)).sum();
  if total < 1e-15 {
    return Err(EngineError::Numerical(
      "standardized returns carry no variance".to_string(),
    ));
  }

  let k = max_components.min(n_assets);
  let mut explained_variance = Vec::with_capacity(k);
  let mut cumulative_variance = Vec::with_capacity(k);
  let mut cumulative = 0.0;
  for &idx in order.iter().take(k) {
    let share = eigen.eigenvalues[idx].max(0.0) / total;
    cumulative += share;
    explained_variance.push(share);
    cumulative_variance.push(cumulative);
  }

  let mut loadings = BTreeMap::new();
  for (a, symbol) in returns.symbols().iter().enumerate() {
    let row: Vec<f64> = order
      .iter()
      .take(k)
      .map(|&idx| eigen.eigenvectors[(a, idx)] * eigen.eigenvalues[idx].max(0.0).sqrt())
      .collect();
    loadings.insert(symbol.clone(), row);
  }

  Ok(FactorAnalysis {
    components: k,
    explained_variance,
    cumulative_variance,
    loadings,
  })
}
