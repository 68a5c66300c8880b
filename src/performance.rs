//! # Performance Analyzer
//!
//! $$
//! R_{ann} = \left(\prod_{t=1}^{n}(1+r_t)\right)^{252/n} - 1
//! $$
//!
//! Return, risk, efficiency, risk-adjusted and tail statistics for one
//! return stream, with an optional benchmark comparison. Report sections
//! degrade independently to inline `{"error": ...}` blocks; only an empty
//! series aborts the call.

mod comparison;
mod ratios;
mod returns;
mod tail;

use serde::Serialize;
use tracing::debug;

pub use comparison::BenchmarkComparison;
pub use ratios::EfficiencyRatios;
pub use ratios::RiskAdjustedMetrics;
pub use returns::ReturnMetrics;
pub use tail::TailMetrics;

use crate::error::EngineError;
use crate::error::MetricBlock;
use crate::risk::historical_cvar;
use crate::risk::historical_var;
use crate::series::ReturnSeries;
use crate::stats::excess_kurtosis;
use crate::stats::normality;
use crate::stats::normality::JarqueBera;
use crate::stats::sample_mean;
use crate::stats::sample_std;
use crate::stats::skewness;
use crate::TRADING_DAYS_PER_YEAR;

/// Smallest date-aligned overlap accepted for benchmark statistics.
pub(crate) const MIN_BENCHMARK_OVERLAP: usize = 30;

/// Significance level of the normality test in the risk block.
const NORMALITY_ALPHA: f64 = 0.05;

/// Runtime configuration for [`PerformanceAnalyzer`].
#[derive(Debug, Clone, Copy)]
pub struct PerformanceConfig {
  /// Annualized risk-free rate for excess-return ratios.
  pub risk_free_rate: f64,
  /// Assumed annual market return for the CAPM fallback path.
  pub market_return_assumption: f64,
  /// Trading days per year for annualization.
  pub trading_days: usize,
  /// Gain/loss cut of the Omega ratio.
  pub omega_threshold: f64,
}

impl Default for PerformanceConfig {
  fn default() -> Self {
    Self {
      risk_free_rate: 0.02,
      market_return_assumption: 0.08,
      trading_days: TRADING_DAYS_PER_YEAR,
      omega_threshold: 0.0,
    }
  }
}

/// Distribution-shape and loss-quantile statistics of the daily returns.
#[derive(Debug, Clone, Serialize)]
pub struct RiskProfile {
  pub annualized_volatility: f64,
  /// Annualized deviation of the losing days alone.
  pub downside_deviation: f64,
  /// Annualized deviation of the below-mean days.
  pub semi_deviation: f64,
  pub var_95: f64,
  pub var_99: f64,
  pub cvar_95: f64,
  pub cvar_99: f64,
  pub skewness: f64,
  pub excess_kurtosis: f64,
  pub jarque_bera: MetricBlock<JarqueBera>,
}

/// Full output of [`PerformanceAnalyzer::analyze_performance`].
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
  pub observations: usize,
  pub returns: MetricBlock<ReturnMetrics>,
  pub risk: MetricBlock<RiskProfile>,
  pub efficiency: MetricBlock<EfficiencyRatios>,
  pub risk_adjusted: MetricBlock<RiskAdjustedMetrics>,
  pub tail: MetricBlock<TailMetrics>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub benchmark: Option<MetricBlock<BenchmarkComparison>>,
}

/// Performance-report engine over immutable return history.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceAnalyzer {
  config: PerformanceConfig,
}

impl PerformanceAnalyzer {
  /// Construct a new analyzer with explicit configuration.
  pub fn new(config: PerformanceConfig) -> Self {
    Self { config }
  }

  /// Borrow analyzer configuration.
  pub fn config(&self) -> &PerformanceConfig {
    &self.config
  }

  /// Build the full performance report. Fails only for an empty series or an
  /// invalid configuration; every metric failure downgrades to an inline
  /// error note.
  pub fn analyze_performance(
    &self,
    series: &ReturnSeries,
    benchmark: Option<&ReturnSeries>,
  ) -> Result<PerformanceReport, EngineError> {
    if series.is_empty() {
      return Err(EngineError::Data("empty return series".to_string()));
    }
    self.validate()?;

    let xs = series.as_slice();
    let trading_days = self.config.trading_days;

    let benchmark_block = benchmark.map(|bench| {
      block(
        comparison::compare_to_benchmark(series, bench, trading_days),
        "benchmark",
      )
    });

    Ok(PerformanceReport {
      observations: xs.len(),
      returns: block(returns::return_metrics(xs, trading_days), "returns"),
      risk: block(risk_profile(xs, trading_days), "risk"),
      efficiency: block(ratios::efficiency_ratios(xs, trading_days), "efficiency"),
      risk_adjusted: block(
        ratios::risk_adjusted_metrics(series, benchmark, &self.config),
        "risk_adjusted",
      ),
      tail: block(tail::tail_metrics(xs, self.config.omega_threshold), "tail"),
      benchmark: benchmark_block,
    })
  }

  fn validate(&self) -> Result<(), EngineError> {
    if !self.config.risk_free_rate.is_finite()
      || !self.config.market_return_assumption.is_finite()
      || !self.config.omega_threshold.is_finite()
    {
      return Err(EngineError::Configuration(
        "performance rates must be finite".to_string(),
      ));
    }
    if self.config.trading_days == 0 {
      return Err(EngineError::Configuration(
        "trading_days must be positive".to_string(),
      ));
    }

    Ok(())
  }
}

/// Build the default-configured performance report.
pub fn analyze_performance(
  series: &ReturnSeries,
  benchmark: Option<&ReturnSeries>,
) -> Result<PerformanceReport, EngineError> {
  PerformanceAnalyzer::default().analyze_performance(series, benchmark)
}

fn risk_profile(xs: &[f64], trading_days: usize) -> Result<RiskProfile, EngineError> {
  if xs.len() < 2 {
    return Err(EngineError::Data(format!(
      "{} observations, need at least 2 for the risk profile",
      xs.len()
    )));
  }

  let factor = (trading_days as f64).sqrt();
  let losses: Vec<f64> = xs.iter().copied().filter(|r| *r < 0.0).collect();
  let mean = sample_mean(xs);
  let below_mean: Vec<f64> = xs.iter().copied().filter(|r| *r < mean).collect();

  Ok(RiskProfile {
    annualized_volatility: sample_std(xs) * factor,
    downside_deviation: sample_std(&losses) * factor,
    semi_deviation: sample_std(&below_mean) * factor,
    var_95: historical_var(xs, 0.95),
    var_99: historical_var(xs, 0.99),
    cvar_95: historical_cvar(xs, 0.95),
    cvar_99: historical_cvar(xs, 0.99),
    skewness: skewness(xs),
    excess_kurtosis: excess_kurtosis(xs),
    jarque_bera: MetricBlock::from_result(normality::jarque_bera(xs, NORMALITY_ALPHA)),
  })
}

fn block<T>(result: Result<T, EngineError>, section: &str) -> MetricBlock<T> {
  if let Err(e) = &result {
    debug!(section, error = %e, "omitting metric block");
  }
  MetricBlock::from_result(result)
}

/// Division that yields 0 instead of Inf or NaN on a zero denominator.
pub(crate) fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
  if denominator.abs() < 1e-15 {
    0.0
  } else {
    numerator / denominator
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use rand::SeedableRng;
  use rand::rngs::StdRng;
  use rand_distr::Distribution;
  use rand_distr::Normal;

  use super::*;

  fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..n)
      .map(|i| start + chrono::Days::new(i as u64))
      .collect()
  }

  fn seeded_series(n: usize, seed: u64) -> ReturnSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0005, 0.01).unwrap();
    let values = (0..n).map(|_| normal.sample(&mut rng)).collect();
    ReturnSeries::new(dates(n), values).unwrap()
  }

  fn benchmark_series(n: usize) -> ReturnSeries {
    let values = (0..n)
      .map(|t| 0.0004 + 0.009 * ((t as f64) * 0.8).sin())
      .collect();
    ReturnSeries::new(dates(n), values).unwrap()
  }

  #[test]
  fn full_report_has_every_section() {
    let series = seeded_series(120, 211);
    let bench = benchmark_series(120);

    let report = analyze_performance(&series, Some(&bench)).unwrap();

    assert_eq!(report.observations, 120);
    assert!(report.returns.is_available());
    assert!(report.risk.is_available());
    assert!(report.efficiency.is_available());
    assert!(report.risk_adjusted.is_available());
    assert!(report.tail.is_available());
    assert!(report.benchmark.as_ref().unwrap().is_available());

    let risk = report.risk.metric().unwrap();
    assert!(risk.var_99 <= risk.var_95);
    assert!(risk.var_95 <= 0.0);
    assert!(risk.cvar_95 <= risk.var_95);
    assert!(risk.jarque_bera.is_available());

    assert!(!report.risk_adjusted.metric().unwrap().approximate);
  }

  #[test]
  fn sharpe_is_consistent_across_sections() {
    let series = seeded_series(150, 223);
    let report = analyze_performance(&series, None).unwrap();

    let annualized = report.returns.metric().unwrap().annualized_return;
    let volatility = report.risk.metric().unwrap().annualized_volatility;
    let sharpe = report.efficiency.metric().unwrap().sharpe_ratio;
    assert!((sharpe - annualized / volatility).abs() < 1e-12);
  }

  #[test]
  fn empty_series_is_fatal() {
    let series = ReturnSeries::new(Vec::new(), Vec::new()).unwrap();
    let err = analyze_performance(&series, None).unwrap_err();
    assert!(err.to_string().contains("insufficient data"));
  }

  #[test]
  fn single_observation_keeps_only_the_return_block() {
    let series = ReturnSeries::new(dates(1), vec![0.015]).unwrap();
    let report = analyze_performance(&series, None).unwrap();

    assert!(report.returns.is_available());
    for section in [
      report.risk.error(),
      report.efficiency.error(),
      report.risk_adjusted.error(),
      report.tail.error(),
    ] {
      assert!(section.unwrap().contains("insufficient data"));
    }
  }

  #[test]
  fn missing_benchmark_marks_capm_approximate() {
    let series = seeded_series(90, 227);
    let report = analyze_performance(&series, None).unwrap();

    assert!(report.benchmark.is_none());
    let metrics = report.risk_adjusted.metric().unwrap();
    assert!(metrics.approximate);

    let annualized = report.returns.metric().unwrap().annualized_return;
    assert!((metrics.jensen_alpha - (annualized - 0.08)).abs() < 1e-12);
  }

  #[test]
  fn short_benchmark_overlap_degrades_to_an_error_note() {
    let series = seeded_series(90, 229);
    let bench = benchmark_series(10);

    let report = analyze_performance(&series, Some(&bench)).unwrap();

    let cmp = report.benchmark.as_ref().unwrap();
    assert!(!cmp.is_available());
    assert!(cmp.error().unwrap().contains("insufficient data"));
    assert!(report.risk_adjusted.metric().unwrap().approximate);
  }

  #[test]
  fn report_serializes_with_inline_notes() {
    let series = ReturnSeries::new(dates(1), vec![0.015]).unwrap();
    let report = analyze_performance(&series, None).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert!(json["returns"]["total_return"].is_number());
    assert!(json["risk"]["error"].is_string());
    assert!(json.get("benchmark").is_none());
  }
}
