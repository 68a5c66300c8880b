//! Beta, alpha and tracking statistics of one asset against a benchmark.

use serde::Serialize;

use crate::error::EngineError;
use crate::series::ReturnSeries;
use crate::stats::pearson;
use crate::stats::sample_covariance;
use crate::stats::sample_mean;
use crate::stats::sample_std;
use crate::stats::sample_variance;

/// Regression-style relation of an asset to its benchmark over the
/// date-aligned overlap.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkRelation {
  /// cov(asset, benchmark) / var(benchmark).
  pub beta: f64,
  /// Annualized asset return minus beta times the annualized benchmark return.
  pub alpha: f64,
  pub correlation: f64,
  pub r_squared: f64,
  /// Annualized standard deviation of the return differences.
  pub tracking_error: f64,
  /// Size of the date-aligned overlap.
  pub observations: usize,
}

pub(crate) fn relate_to_benchmark(
  asset: &ReturnSeries,
  benchmark: &ReturnSeries,
  min_overlap: usize,
  trading_days: usize,
) -> Result<BenchmarkRelation, EngineError> {
  let (a, b) = asset.align_with(benchmark);
  let n = a.len();
  if n < min_overlap {
    return Err(EngineError::Data(format!(
      "{n} overlapping dates with the benchmark, need at least {min_overlap}"
    )));
  }

  let a = a.to_vec();
  let b = b.to_vec();
  let bench_var = sample_variance(&b, sample_mean(&b));
  if bench_var < 1e-15 {
    return Err(EngineError::Numerical(
      "benchmark variance is zero over the overlap".to_string(),
    ));
  }

  let beta = sample_covariance(&a, &b) / bench_var;
  let alpha =
    sample_mean(&a) * trading_days as f64 - beta * sample_mean(&b) * trading_days as f64;
  let correlation = pearson(&a, &b);

  let diffs: Vec<f64> = a.iter().zip(b.iter()).map(|(x, y)| x - y).collect();
  let tracking_error = sample_std(&diffs) * (trading_days as f64).sqrt();

  Ok(BenchmarkRelation {
    beta,
    alpha,
    correlation,
    r_squared: correlation * correlation,
    tracking_error,
    observations: n,
  })
}
