//! Daily, annualized, rolling-window and EWMA volatility of one return stream.

use serde::Serialize;

use crate::error::EngineError;
use crate::error::MetricBlock;
use crate::stats::sample_mean;
use crate::stats::sample_std;

/// Volatility readings for a single asset.
#[derive(Debug, Clone, Serialize)]
pub struct VolatilityMetrics {
  /// Standard deviation of daily returns.
  pub daily: f64,
  /// Daily volatility scaled by the square root of the trading year.
  pub annualized: f64,
  /// Annualized volatility of the most recent window, when enough history exists.
  pub rolling_annualized: MetricBlock<f64>,
  /// Exponentially weighted annualized volatility.
  pub ewma_annualized: f64,
}

pub(crate) fn asset_volatility(
  xs: &[f64],
  window: usize,
  decay: f64,
  trading_days: usize,
) -> Result<VolatilityMetrics, EngineError> {
  if xs.len() < 2 {
    return Err(EngineError::Data(format!(
      "{} observations, need at least 2 for volatility",
      xs.len()
    )));
  }

  let factor = (trading_days as f64).sqrt();
  let daily = sample_std(xs);

  let rolling_annualized = if xs.len() >= window {
    MetricBlock::Metric(sample_std(&xs[xs.len() - window..]) * factor)
  } else {
    MetricBlock::unavailable(format!(
      "insufficient data: {} observations for a {window}-day rolling window",
      xs.len()
    ))
  };

  Ok(VolatilityMetrics {
    daily,
    annualized: daily * factor,
    rolling_annualized,
    ewma_annualized: (ewma_variance(xs, decay) * trading_days as f64).sqrt(),
  })
}

/// RiskMetrics-style recursion over squared deviations, seeded with the first
/// observation.
pub(crate) fn ewma_variance(xs: &[f64], lambda: f64) -> f64 {
  let mean = sample_mean(xs);
  let mut var = (xs[0] - mean).powi(2);
  for x in &xs[1..] {
    let dev = x - mean;
    var = lambda * var + (1.0 - lambda) * dev * dev;
  }

  var.max(0.0)
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn annualization_scales_by_root_trading_days() {
    let xs = [0.01, 0.03, -0.01, 0.02, 0.0];
    let metrics = asset_volatility(&xs, 3, 0.94, 252).unwrap();

    assert_relative_eq!(
      metrics.annualized,
      metrics.daily * 252f64.sqrt(),
      epsilon = 1e-12
    );
    assert!(metrics.daily > 0.0);
  }

  #[test]
  fn rolling_window_uses_the_latest_observations() {
    // Quiet start, volatile tail: the 3-day window must see only the tail.
    let xs = [0.001, -0.001, 0.001, 0.05, -0.05, 0.05];
    let metrics = asset_volatility(&xs, 3, 0.94, 252).unwrap();

    let tail_vol = sample_std(&xs[3..]) * 252f64.sqrt();
    let rolling = *metrics.rolling_annualized.metric().unwrap();
    assert_relative_eq!(rolling, tail_vol, epsilon = 1e-12);
    assert!(rolling > metrics.annualized);
  }

  #[test]
  fn short_history_reports_an_inline_note_for_the_window() {
    let xs = [0.01, -0.02, 0.005];
    let metrics = asset_volatility(&xs, 30, 0.94, 252).unwrap();

    assert!(!metrics.rolling_annualized.is_available());
    let note = metrics.rolling_annualized.error().unwrap();
    assert!(note.contains("insufficient data"), "{note}");
  }

  #[test]
  fn ewma_weighs_recent_shocks_heavier() {
    let mut xs = vec![0.001; 60];
    for _ in 0..5 {
      xs.push(0.04);
      xs.push(-0.04);
    }

    let ewma = ewma_variance(&xs, 0.94);
    let flat = sample_std(&xs).powi(2);
    assert!(ewma > flat, "ewma {ewma} should exceed flat variance {flat}");
  }

  #[test]
  fn one_observation_is_rejected() {
    let err = asset_volatility(&[0.01], 30, 0.94, 252).unwrap_err();
    assert!(err.to_string().contains("insufficient data"));
  }
}
