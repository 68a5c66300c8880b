//! # Sample Covariance
//!
//! Unbiased estimator over centered daily returns.

use ndarray::Array2;

/// Daily sample covariance with ddof = 1. Caller guarantees >= 2 rows.
pub(crate) fn daily_sample_covariance(values: &Array2<f64>) -> Array2<f64> {
  let (n_obs, n_assets) = values.dim();

  let mut means = vec![0.0; n_assets];
  for (j, mean) in means.iter_mut().enumerate() {
    *mean = values.column(j).sum() / n_obs as f64;
  }

  let mut cov = Array2::zeros((n_assets, n_assets));
  let denom = (n_obs - 1) as f64;

  for i in 0..n_assets {
    for j in i..n_assets {
      let mut acc = 0.0;
      for t in 0..n_obs {
        acc += (values[(t, i)] - means[i]) * (values[(t, j)] - means[j]);
      }
      let c = acc / denom;
      cov[(i, j)] = c;
      cov[(j, i)] = c;
    }
  }

  cov
}

#[cfg(test)]
mod tests {
  use ndarray::array;

  use super::daily_sample_covariance;

  #[test]
  fn matches_hand_computed_two_asset_case() {
    let values = array![[0.01, 0.02], [0.03, -0.02], [-0.01, 0.04]];
    let cov = daily_sample_covariance(&values);

    // var(x) = 4e-4, var(y) = 28/3 e-4, cov(x, y) = -6e-4 with ddof = 1
    assert!((cov[(0, 0)] - 4e-4).abs() < 1e-12);
    assert!((cov[(1, 1)] - 28.0 / 3.0 * 1e-4).abs() < 1e-12);
    assert!((cov[(0, 1)] + 6e-4).abs() < 1e-12);
    assert_eq!(cov[(0, 1)], cov[(1, 0)]);
  }
}
