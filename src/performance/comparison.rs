//! Head-to-head comparison of a return stream against a benchmark.

use linreg::linear_regression;
use serde::Serialize;

use super::MIN_BENCHMARK_OVERLAP;
use super::guarded_ratio;
use crate::error::EngineError;
use crate::series::ReturnSeries;
use crate::stats::pearson;
use crate::stats::sample_mean;
use crate::stats::sample_std;

/// Relative performance over the date-aligned overlap.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkComparison {
  /// Annualized regression intercept.
  pub alpha: f64,
  /// Regression slope of asset on benchmark returns.
  pub beta: f64,
  pub correlation: f64,
  pub r_squared: f64,
  /// Annualized deviation of the active returns.
  pub tracking_error: f64,
  /// Annualized active return per unit of tracking error.
  pub information_ratio: f64,
  /// Mean asset return over mean benchmark return on benchmark-up days.
  pub upside_capture: f64,
  /// Same ratio on benchmark-down days.
  pub downside_capture: f64,
  pub observations: usize,
}

pub(crate) fn compare_to_benchmark(
  series: &ReturnSeries,
  benchmark: &ReturnSeries,
  trading_days: usize,
) -> Result<BenchmarkComparison, EngineError> {
  let (a, b) = series.align_with(benchmark);
  let n = a.len();
  if n < MIN_BENCHMARK_OVERLAP {
    return Err(EngineError::Data(format!(
      "{n} overlapping dates with the benchmark, need at least {MIN_BENCHMARK_OVERLAP}"
    )));
  }

  let a = a.to_vec();
  let b = b.to_vec();
  let td = trading_days as f64;

  let (beta, daily_alpha): (f64, f64) = linear_regression(&b, &a)
    .map_err(|e| EngineError::Numerical(format!("benchmark regression failed: {e}")))?;
  let correlation = pearson(&a, &b);

  let active: Vec<f64> = a.iter().zip(b.iter()).map(|(x, y)| x - y).collect();
  let tracking_error = sample_std(&active) * td.sqrt();

  Ok(BenchmarkComparison {
    alpha: daily_alpha * td,
    beta,
    correlation,
    r_squared: correlation * correlation,
    tracking_error,
    information_ratio: guarded_ratio(sample_mean(&active) * td, tracking_error),
    upside_capture: capture(&a, &b, |r| r > 0.0),
    downside_capture: capture(&a, &b, |r| r < 0.0),
    observations: n,
  })
}

/// Mean asset return over mean benchmark return on the days selected by the
/// predicate against the benchmark.
fn capture(asset: &[f64], benchmark: &[f64], side: impl Fn(f64) -> bool) -> f64 {
  let pairs: Vec<(f64, f64)> = asset
    .iter()
    .zip(benchmark.iter())
    .filter(|(_, &b)| side(b))
    .map(|(&a, &b)| (a, b))
    .collect();
  if pairs.is_empty() {
    return 0.0;
  }

  let mean_asset = pairs.iter().map(|(a, _)| a).sum::<f64>() / pairs.len() as f64;
  let mean_bench = pairs.iter().map(|(_, b)| b).sum::<f64>() / pairs.len() as f64;
  guarded_ratio(mean_asset, mean_bench)
}
