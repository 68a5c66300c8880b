//! # Stats
//!
//! $$
//! \hat\sigma^2 = \frac{1}{n-1}\sum_{i=1}^n (x_i-\bar x)^2
//! $$
//!
//! Scalar sample statistics shared by the risk and performance engines.

pub mod normality;

pub fn sample_mean(xs: &[f64]) -> f64 {
  if xs.is_empty() {
    0.0
  } else {
    xs.iter().sum::<f64>() / xs.len() as f64
  }
}

/// Unbiased sample variance around a precomputed mean.
pub fn sample_variance(xs: &[f64], mean: f64) -> f64 {
  if xs.len() < 2 {
    return 0.0;
  }

  let mut acc = 0.0;
  for &x in xs {
    let d = x - mean;
    acc += d * d;
  }
  acc / (xs.len() - 1) as f64
}

pub fn sample_std(xs: &[f64]) -> f64 {
  sample_variance(xs, sample_mean(xs)).sqrt()
}

/// Unbiased sample covariance between two series of equal length.
pub fn sample_covariance(x: &[f64], y: &[f64]) -> f64 {
  let n = x.len().min(y.len());
  if n < 2 {
    return 0.0;
  }

  let mx = sample_mean(&x[..n]);
  let my = sample_mean(&y[..n]);

  let mut acc = 0.0;
  for i in 0..n {
    acc += (x[i] - mx) * (y[i] - my);
  }
  acc / (n - 1) as f64
}

pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
  let n = x.len().min(y.len());
  if n < 2 {
    return 0.0;
  }

  let mx = sample_mean(&x[..n]);
  let my = sample_mean(&y[..n]);

  let mut cov = 0.0;
  let mut sx = 0.0;
  let mut sy = 0.0;

  for i in 0..n {
    let dx = x[i] - mx;
    let dy = y[i] - my;
    cov += dx * dy;
    sx += dx * dx;
    sy += dy * dy;
  }

  let denom = (sx * sy).sqrt();
  if denom < 1e-15 {
    0.0
  } else {
    (cov / denom).clamp(-1.0, 1.0)
  }
}

/// Adjusted Fisher-Pearson sample skewness.
pub fn skewness(xs: &[f64]) -> f64 {
  let n = xs.len();
  if n < 3 {
    return 0.0;
  }

  let m = sample_mean(xs);
  let s = sample_std(xs);
  if s < 1e-15 {
    return 0.0;
  }

  let nf = n as f64;
  let m3 = xs.iter().map(|&x| ((x - m) / s).powi(3)).sum::<f64>() / nf;
  (nf * (nf - 1.0)).sqrt() / (nf - 2.0) * m3
}

/// Bias-corrected excess kurtosis.
pub fn excess_kurtosis(xs: &[f64]) -> f64 {
  let n = xs.len();
  if n < 4 {
    return 0.0;
  }

  let m = sample_mean(xs);
  let s = sample_std(xs);
  if s < 1e-15 {
    return 0.0;
  }

  let nf = n as f64;
  let m4 = xs.iter().map(|&x| ((x - m) / s).powi(4)).sum::<f64>() / nf;
  (nf - 1.0) / ((nf - 2.0) * (nf - 3.0)) * ((nf + 1.0) * (m4 - 3.0) + 6.0)
}

/// Linearly interpolated percentile, `pct` in [0, 100].
pub fn percentile(xs: &[f64], pct: f64) -> f64 {
  if xs.is_empty() {
    return 0.0;
  }

  let mut sorted = xs.to_vec();
  sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

  let idx = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
  let lo = idx.floor() as usize;
  let hi = idx.ceil() as usize;

  if lo == hi || hi >= sorted.len() {
    sorted[lo.min(sorted.len() - 1)]
  } else {
    let frac = idx - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn variance_matches_hand_computed_value() {
    let xs = [1.0, 2.0, 3.0, 4.0];
    let var = sample_variance(&xs, sample_mean(&xs));
    assert!((var - 5.0 / 3.0).abs() < 1e-12);
  }

  #[test]
  fn pearson_is_one_for_colinear_series() {
    let x = [1.0, 2.0, 3.0, 4.0, 5.0];
    let y = [2.0, 4.0, 6.0, 8.0, 10.0];
    assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
  }

  #[test]
  fn covariance_of_anticorrelated_series_is_negative() {
    let x = [0.01, 0.02, 0.03, 0.04];
    let y = [0.04, 0.03, 0.02, 0.01];
    assert!(sample_covariance(&x, &y) < 0.0);
  }

  #[test]
  fn skewness_detects_left_tail() {
    let xs = [0.01, 0.012, 0.011, 0.009, 0.01, -0.2];
    assert!(skewness(&xs) < 0.0);
  }

  #[test]
  fn percentile_interpolates_between_order_statistics() {
    let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
    assert!((percentile(&xs, 50.0) - 5.5).abs() < 1e-12);
    assert!((percentile(&xs, 0.0) - 1.0).abs() < 1e-12);
    assert!((percentile(&xs, 100.0) - 10.0).abs() < 1e-12);
  }

  #[test]
  fn zero_variance_series_yields_zero_moments() {
    let xs = [0.02; 16];
    assert_eq!(skewness(&xs), 0.0);
    assert_eq!(excess_kurtosis(&xs), 0.0);
  }
}
