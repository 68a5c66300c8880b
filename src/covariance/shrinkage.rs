//! # Shrinkage Covariance
//!
//! $$
//! \Sigma^{*} = \delta^{*}\mu I + (1-\delta^{*}) S
//! $$
//!
//! Ledoit-Wolf (2004) analytical shrinkage toward the scaled identity target.

use ndarray::Array2;

/// Daily Ledoit-Wolf covariance and the shrinkage intensity applied.
///
/// `delta = b^2 / d^2` with `b^2 <= d^2` by construction, so the intensity
/// is always in [0, 1] and a zero-dispersion sample shrinks nothing.
/// Caller guarantees >= 2 rows.
pub(crate) fn daily_ledoit_wolf(values: &Array2<f64>) -> (Array2<f64>, f64) {
  let (n_obs, n_assets) = values.dim();
  let n = n_obs as f64;
  let p = n_assets as f64;

  let mut centered = values.clone();
  for j in 0..n_assets {
    let mean = values.column(j).sum() / n;
    for t in 0..n_obs {
      centered[(t, j)] -= mean;
    }
  }

  // S = X^T X / n
  let mut s = Array2::zeros((n_assets, n_assets));
  for i in 0..n_assets {
    for j in i..n_assets {
      let mut acc = 0.0;
      for t in 0..n_obs {
        acc += centered[(t, i)] * centered[(t, j)];
      }
      let c = acc / n;
      s[(i, j)] = c;
      s[(j, i)] = c;
    }
  }

  // mu = <S, I> / p, d^2 = ||S - mu I||_F^2 / p
  let mu = s.diag().sum() / p;
  let mut d2 = 0.0;
  for i in 0..n_assets {
    for j in 0..n_assets {
      let target = if i == j { mu } else { 0.0 };
      let diff = s[(i, j)] - target;
      d2 += diff * diff;
    }
  }
  d2 /= p;

  // b^2 = min(d^2, (1/n^2) sum_t ||y_t y_t^T - S||_F^2 / p)
  let mut bbar2 = 0.0;
  for t in 0..n_obs {
    for i in 0..n_assets {
      for j in 0..n_assets {
        let diff = centered[(t, i)] * centered[(t, j)] - s[(i, j)];
        bbar2 += diff * diff;
      }
    }
  }
  bbar2 /= n * n * p;
  let b2 = bbar2.min(d2);

  let delta = if d2 > 1e-30 { b2 / d2 } else { 0.0 };

  let mut shrunk = s * (1.0 - delta);
  for i in 0..n_assets {
    shrunk[(i, i)] += delta * mu;
  }

  (shrunk, delta)
}
