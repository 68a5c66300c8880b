//! Efficiency and risk-adjusted performance ratios.
//!
//! Every ratio returns 0 on a zero denominator instead of Inf or NaN.

use serde::Serialize;

use super::MIN_BENCHMARK_OVERLAP;
use super::PerformanceConfig;
use super::guarded_ratio;
use super::returns::annualize_geometric;
use crate::error::EngineError;
use crate::risk::drawdown_curve;
use crate::risk::episode_troughs;
use crate::series::ReturnSeries;
use crate::stats::sample_covariance;
use crate::stats::sample_mean;
use crate::stats::sample_std;
use crate::stats::sample_variance;

/// Return-per-risk ratios over one history.
#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyRatios {
  /// Annualized return over annualized volatility.
  pub sharpe_ratio: f64,
  /// Annualized return over the annualized deviation of the losing days.
  pub sortino_ratio: f64,
  /// Annualized return over the deepest drawdown.
  pub calmar_ratio: f64,
  /// Annualized return over the mean episode drawdown.
  pub sterling_ratio: f64,
  /// Annualized return over the root of the summed squared episode drawdowns.
  pub burke_ratio: f64,
}

pub(crate) fn efficiency_ratios(
  xs: &[f64],
  trading_days: usize,
) -> Result<EfficiencyRatios, EngineError> {
  if xs.len() < 2 {
    return Err(EngineError::Data(format!(
      "{} observations, need at least 2 for efficiency ratios",
      xs.len()
    )));
  }

  let factor = (trading_days as f64).sqrt();
  let total = xs.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
  let annualized = annualize_geometric(total, xs.len(), trading_days);

  let volatility = sample_std(xs) * factor;
  let losses: Vec<f64> = xs.iter().copied().filter(|r| *r < 0.0).collect();
  let downside = sample_std(&losses) * factor;

  let curve = drawdown_curve(xs)?;
  let max_drawdown = curve.iter().cloned().fold(0.0, f64::min);
  let troughs = episode_troughs(&curve);
  let mean_trough = if troughs.is_empty() {
    0.0
  } else {
    troughs.iter().sum::<f64>() / troughs.len() as f64
  };
  let burke_denominator = troughs.iter().map(|t| t * t).sum::<f64>().sqrt();

  Ok(EfficiencyRatios {
    sharpe_ratio: guarded_ratio(annualized, volatility),
    sortino_ratio: guarded_ratio(annualized, downside),
    calmar_ratio: guarded_ratio(annualized, max_drawdown.abs()),
    sterling_ratio: guarded_ratio(annualized, mean_trough.abs()),
    burke_ratio: guarded_ratio(annualized, burke_denominator),
  })
}

/// CAPM-flavored ratios. Without a usable benchmark the classic
/// simplification applies: beta 1.0 and the configured market-return
/// assumption, flagged via `approximate`.
#[derive(Debug, Clone, Serialize)]
pub struct RiskAdjustedMetrics {
  /// Annualized excess return over the risk-free rate, per unit of its
  /// annualized deviation.
  pub information_ratio: f64,
  pub treynor_ratio: f64,
  pub jensen_alpha: f64,
  /// True when beta and the market return come from the fallback assumption.
  pub approximate: bool,
}

pub(crate) fn risk_adjusted_metrics(
  series: &ReturnSeries,
  benchmark: Option<&ReturnSeries>,
  config: &PerformanceConfig,
) -> Result<RiskAdjustedMetrics, EngineError> {
  let xs = series.as_slice();
  if xs.len() < 2 {
    return Err(EngineError::Data(format!(
      "{} observations, need at least 2 for risk-adjusted ratios",
      xs.len()
    )));
  }

  let td = config.trading_days as f64;
  let total = xs.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
  let annualized = annualize_geometric(total, xs.len(), config.trading_days);

  let daily_rf = config.risk_free_rate / td;
  let excess: Vec<f64> = xs.iter().map(|r| r - daily_rf).collect();
  let information_ratio = guarded_ratio(
    sample_mean(&excess) * td,
    sample_std(&excess) * td.sqrt(),
  );

  let capm = benchmark.and_then(|bench| {
    let (a, b) = series.align_with(bench);
    if a.len() < MIN_BENCHMARK_OVERLAP {
      return None;
    }
    let a = a.to_vec();
    let b = b.to_vec();
    let bench_var = sample_variance(&b, sample_mean(&b));
    if bench_var < 1e-15 {
      return None;
    }
    let beta = sample_covariance(&a, &b) / bench_var;
    Some((beta, sample_mean(&b) * td))
  });
  let approximate = capm.is_none();
  let (beta, market_return) = capm.unwrap_or((1.0, config.market_return_assumption));

  Ok(RiskAdjustedMetrics {
    information_ratio,
    treynor_ratio: guarded_ratio(annualized - config.risk_free_rate, beta),
    jensen_alpha: annualized
      - (config.risk_free_rate + beta * (market_return - config.risk_free_rate)),
    approximate,
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use chrono::NaiveDate;

  use super::*;

  fn series(values: Vec<f64>) -> ReturnSeries {
    let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let dates = (0..values.len())
      .map(|i| start + chrono::Days::new(i as u64))
      .collect();
    ReturnSeries::new(dates, values).unwrap()
  }

  #[test]
  fn riskless_gains_zero_out_every_ratio() {
    let xs = vec![0.001; 50];
    let ratios = efficiency_ratios(&xs, 252).unwrap();

    assert_eq!(ratios.sharpe_ratio, 0.0);
    assert_eq!(ratios.sortino_ratio, 0.0);
    assert_eq!(ratios.calmar_ratio, 0.0);
    assert_eq!(ratios.sterling_ratio, 0.0);
    assert_eq!(ratios.burke_ratio, 0.0);
  }

  #[test]
  fn sharpe_divides_annualized_return_by_volatility() {
    let xs = [0.02, -0.01, 0.015, -0.005, 0.01];
    let ratios = efficiency_ratios(&xs, 252).unwrap();

    let total = xs.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
    let annualized = annualize_geometric(total, xs.len(), 252);
    let volatility = sample_std(&xs) * 252f64.sqrt();
    assert_relative_eq!(ratios.sharpe_ratio, annualized / volatility, epsilon = 1e-12);
  }

  #[test]
  fn calmar_uses_the_deepest_drawdown() {
    let xs = [0.1, -0.2, 0.05, 0.25, -0.1];
    let ratios = efficiency_ratios(&xs, 252).unwrap();

    let total = xs.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
    let annualized = annualize_geometric(total, xs.len(), 252);
    assert_relative_eq!(ratios.calmar_ratio, annualized / 0.2, epsilon = 1e-9);
    assert!(ratios.burke_ratio.abs() <= ratios.sterling_ratio.abs());
  }

  #[test]
  fn capm_falls_back_to_the_documented_assumption() {
    let asset = series(vec![0.002, -0.001, 0.003, 0.001, -0.002, 0.004, 0.0, 0.001]);
    let config = PerformanceConfig::default();

    let metrics = risk_adjusted_metrics(&asset, None, &config).unwrap();

    assert!(metrics.approximate);
    let xs = asset.as_slice();
    let total = xs.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
    let annualized = annualize_geometric(total, xs.len(), 252);
    assert_relative_eq!(metrics.treynor_ratio, annualized - 0.02, epsilon = 1e-12);
    assert_relative_eq!(metrics.jensen_alpha, annualized - 0.08, epsilon = 1e-12);
  }

  #[test]
  fn real_benchmark_beta_replaces_the_assumption() {
    let bench_values: Vec<f64> = (0..40)
      .map(|t| 0.001 + 0.008 * ((t as f64) * 0.9).sin())
      .collect();
    let asset_values: Vec<f64> = bench_values.iter().map(|r| 1.5 * r).collect();
    let asset = series(asset_values);
    let bench = series(bench_values.clone());
    let config = PerformanceConfig::default();

    let metrics = risk_adjusted_metrics(&asset, Some(&bench), &config).unwrap();

    assert!(!metrics.approximate);
    let xs = asset.as_slice();
    let total = xs.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;
    let annualized = annualize_geometric(total, xs.len(), 252);
    assert_relative_eq!(
      metrics.treynor_ratio,
      (annualized - 0.02) / 1.5,
      epsilon = 1e-6
    );
    let market = sample_mean(&bench_values) * 252.0;
    assert_relative_eq!(
      metrics.jensen_alpha,
      annualized - (0.02 + 1.5 * (market - 0.02)),
      epsilon = 1e-6
    );
  }

  #[test]
  fn single_observation_is_rejected() {
    assert!(efficiency_ratios(&[0.01], 252).is_err());
    let asset = series(vec![0.01]);
    assert!(risk_adjusted_metrics(&asset, None, &PerformanceConfig::default()).is_err());
  }
}
