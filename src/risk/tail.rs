//! Historical and parametric value-at-risk with conditional tail means.
//!
//! Quantiles follow the return sign convention: a 95% VaR of -0.02 reads as
//! a one-day loss of 2% or worse with 5% probability.

use serde::Serialize;
use statrs::distribution::ContinuousCDF;
use statrs::distribution::Normal;

use crate::error::EngineError;
use crate::stats::percentile;
use crate::stats::sample_mean;
use crate::stats::sample_std;

/// Value-at-risk readings at the 95% and 99% confidence levels.
#[derive(Debug, Clone, Serialize)]
pub struct ValueAtRisk {
  pub historical_var_95: f64,
  pub historical_var_99: f64,
  pub historical_cvar_95: f64,
  pub historical_cvar_99: f64,
  pub parametric_var_95: f64,
  pub parametric_var_99: f64,
}

pub(crate) fn asset_value_at_risk(xs: &[f64]) -> Result<ValueAtRisk, EngineError> {
  if xs.len() < 2 {
    return Err(EngineError::Data(format!(
      "{} observations, need at least 2 for value-at-risk",
      xs.len()
    )));
  }

  Ok(ValueAtRisk {
    historical_var_95: historical_var(xs, 0.95),
    historical_var_99: historical_var(xs, 0.99),
    historical_cvar_95: historical_cvar(xs, 0.95),
    historical_cvar_99: historical_cvar(xs, 0.99),
    parametric_var_95: parametric_var(xs, 0.95)?,
    parametric_var_99: parametric_var(xs, 0.99)?,
  })
}

/// Empirical return quantile at `1 - confidence`.
pub(crate) fn historical_var(xs: &[f64], confidence: f64) -> f64 {
  percentile(xs, (1.0 - confidence) * 100.0)
}

/// Mean of the returns at or below the historical quantile.
pub(crate) fn historical_cvar(xs: &[f64], confidence: f64) -> f64 {
  let var = historical_var(xs, confidence);
  let tail: Vec<f64> = xs.iter().copied().filter(|&x| x <= var).collect();
  if tail.is_empty() {
    return var;
  }

  sample_mean(&tail)
}

/// Normal quantile around the sample moments, `mu - z sigma`.
pub(crate) fn parametric_var(xs: &[f64], confidence: f64) -> Result<f64, EngineError> {
  let standard_normal = Normal::new(0.0, 1.0)
    .map_err(|e| EngineError::Numerical(format!("standard normal unavailable: {e}")))?;
  let z = standard_normal.inverse_cdf(confidence);

  Ok(sample_mean(xs) - z * sample_std(xs))
}
