//! # Normality
//!
//! $$
//! JB=\frac{n}{6}\left(S^2+\frac{1}{4}K^2\right)
//! $$
//!
//! Jarque-Bera test under chi-square(2) asymptotics.

use serde::Serialize;
use statrs::distribution::ChiSquared;
use statrs::distribution::ContinuousCDF;

use crate::error::EngineError;

/// Result of the Jarque-Bera normality test.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct JarqueBera {
  /// JB test statistic.
  pub statistic: f64,
  /// p-value under chi-square(2) asymptotics.
  pub p_value: f64,
  /// Whether normality is retained at the significance level.
  pub is_normal: bool,
}

/// Jarque-Bera test for normality at significance level `alpha`.
pub fn jarque_bera(sample: &[f64], alpha: f64) -> Result<JarqueBera, EngineError> {
  if sample.len() < 8 {
    return Err(EngineError::Data(format!(
      "Jarque-Bera requires at least 8 observations, got {}",
      sample.len()
    )));
  }
  if sample.iter().any(|x| !x.is_finite()) {
    return Err(EngineError::Data(
      "Jarque-Bera requires finite observations".to_string(),
    ));
  }
  if alpha <= 0.0 || alpha >= 1.0 {
    return Err(EngineError::Configuration(format!(
      "alpha must be in (0, 1), got {alpha}"
    )));
  }

  let n = sample.len() as f64;
  let mean = sample.iter().sum::<f64>() / n;

  let mut m2 = 0.0;
  let mut m3 = 0.0;
  let mut m4 = 0.0;
  for &x in sample {
    let d = x - mean;
    let d2 = d * d;
    m2 += d2;
    m3 += d2 * d;
    m4 += d2 * d2;
  }
  m2 /= n;
  m3 /= n;
  m4 /= n;

  if m2 <= 0.0 || !m2.is_finite() {
    return Err(EngineError::Numerical(
      "Jarque-Bera is undefined for a zero-variance sample".to_string(),
    ));
  }

  let skewness = m3 / m2.powf(1.5);
  let excess_kurtosis = m4 / (m2 * m2) - 3.0;
  let statistic = (n / 6.0) * (skewness * skewness + 0.25 * excess_kurtosis * excess_kurtosis);

  let chi2 = ChiSquared::new(2.0)
    .map_err(|e| EngineError::Numerical(format!("chi-square(2) unavailable: {e}")))?;
  let p_value = (1.0 - chi2.cdf(statistic)).clamp(0.0, 1.0);

  Ok(JarqueBera {
    statistic,
    p_value,
    is_normal: p_value >= alpha,
  })
}
