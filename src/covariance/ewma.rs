//! # EWMA Covariance
//!
//! $$
//! \Sigma_t = \lambda \Sigma_{t-1} + (1-\lambda) y_t y_t^{\top}
//! $$
//!
//! RiskMetrics-style exponentially weighted covariance recursion.

use ndarray::Array2;

/// Daily EWMA covariance with decay `lambda` in (0, 1).
///
/// Returns are centered by their sample means; the recursion is seeded with
/// the first centered outer product. Caller guarantees >= 2 rows.
pub(crate) fn daily_ewma_covariance(values: &Array2<f64>, lambda: f64) -> Array2<f64> {
  let (n_obs, n_assets) = values.dim();

  let mut means = vec![0.0; n_assets];
  for (j, mean) in means.iter_mut().enumerate() {
    *mean = values.column(j).sum() / n_obs as f64;
  }

  let mut cov = Array2::zeros((n_assets, n_assets));
  for i in 0..n_assets {
    for j in i..n_assets {
      let c = (values[(0, i)] - means[i]) * (values[(0, j)] - means[j]);
      cov[(i, j)] = c;
      cov[(j, i)] = c;
    }
  }

  let one_minus = 1.0 - lambda;
  for t in 1..n_obs {
    for i in 0..n_assets {
      for j in i..n_assets {
        let yi = values[(t, i)] - means[i];
        let yj = values[(t, j)] - means[j];
        let c = lambda * cov[(i, j)] + one_minus * yi * yj;
        cov[(i, j)] = c;
        cov[(j, i)] = c;
      }
    }
  }

  cov
}
