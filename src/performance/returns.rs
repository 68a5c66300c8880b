//! Compounded and per-day return statistics.

use serde::Serialize;

use crate::error::EngineError;
use crate::stats::percentile;
use crate::stats::sample_mean;

/// Headline return figures of one return stream.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnMetrics {
  /// Compounded return over the whole history.
  pub total_return: f64,
  /// Geometric annualization of the total return.
  pub annualized_return: f64,
  /// Arithmetic daily mean scaled to a year.
  pub mean_annualized: f64,
  pub median_daily: f64,
  pub best_day: f64,
  pub worst_day: f64,
  /// Share of strictly positive days.
  pub win_rate: f64,
}

pub(crate) fn return_metrics(xs: &[f64], trading_days: usize) -> Result<ReturnMetrics, EngineError> {
  if xs.is_empty() {
    return Err(EngineError::Data("no observations".to_string()));
  }

  let total_return = xs.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
  let wins = xs.iter().filter(|&&r| r > 0.0).count();

  Ok(ReturnMetrics {
    total_return,
    annualized_return: annualize_geometric(total_return, xs.len(), trading_days),
    mean_annualized: sample_mean(xs) * trading_days as f64,
    median_daily: percentile(xs, 50.0),
    best_day: xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
    worst_day: xs.iter().cloned().fold(f64::INFINITY, f64::min),
    win_rate: wins as f64 / xs.len() as f64,
  })
}

/// Scale a compounded return held over `n` observations to a trading year.
/// A wealth-wiping history annualizes to a full loss rather than NaN.
pub(crate) fn annualize_geometric(total_return: f64, n: usize, trading_days: usize) -> f64 {
  let base = 1.0 + total_return;
  if base <= 0.0 {
    return -1.0;
  }

  base.powf(trading_days as f64 / n as f64) - 1.0
}
