//! # Risk Model Engine
//!
//! $$
//! \sigma_p = \sqrt{\mathbf{w}' \Sigma \mathbf{w}}
//! $$
//!
//! Per-asset and portfolio risk reports: volatility, value-at-risk, drawdown,
//! benchmark relation, variance contributions and principal-component
//! factors. A metric whose preconditions fail is reported as an inline
//! `{"error": ...}` block; only an empty return matrix aborts the call.

mod benchmark;
mod contribution;
mod drawdown;
mod factor;
mod tail;
mod volatility;

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

pub use benchmark::BenchmarkRelation;
pub use contribution::RiskContribution;
pub use drawdown::DrawdownMetrics;
pub use factor::FactorAnalysis;
pub use tail::ValueAtRisk;
pub use volatility::VolatilityMetrics;

pub(crate) use drawdown::drawdown_curve;
pub(crate) use drawdown::episode_troughs;
pub(crate) use tail::historical_cvar;
pub(crate) use tail::historical_var;

use crate::covariance::CovarianceEstimator;
use crate::covariance::CovarianceMethod;
use crate::covariance::DEFAULT_EWMA_DECAY;
use crate::error::EngineError;
use crate::error::MetricBlock;
use crate::series::ReturnMatrix;
use crate::series::ReturnSeries;
use crate::stats::pearson;
use crate::TRADING_DAYS_PER_YEAR;

/// Covariance model backing the portfolio-level block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskModelKind {
  #[default]
  SampleCovariance,
  Shrinkage,
  /// Shrinkage covariance plus a principal-component factor block.
  FactorModel,
}

impl RiskModelKind {
  /// Parse a string into a [`RiskModelKind`].
  pub fn from_str(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "shrinkage" | "ledoit-wolf" | "ledoitwolf" => Self::Shrinkage,
      "factor_model" | "factor-model" | "factor" => Self::FactorModel,
      _ => Self::SampleCovariance,
    }
  }
}

/// Runtime configuration for [`RiskModelEngine`].
#[derive(Debug, Clone)]
pub struct RiskEngineConfig {
  /// Trading days per year for annualization.
  pub trading_days: usize,
  /// Decay of the EWMA volatility recursion.
  pub ewma_decay: f64,
  /// Window of the rolling volatility reading, in observations.
  pub rolling_window: usize,
  /// Smallest date-aligned overlap accepted for benchmark relations.
  pub min_benchmark_overlap: usize,
  /// Upper bound on reported principal components.
  pub max_factor_components: usize,
  /// Portfolio weights; `None` analyzes the equal-weight portfolio.
  pub weights: Option<Vec<f64>>,
}

impl Default for RiskEngineConfig {
  fn default() -> Self {
    Self {
      trading_days: TRADING_DAYS_PER_YEAR,
      ewma_decay: DEFAULT_EWMA_DECAY,
      rolling_window: 30,
      min_benchmark_overlap: 30,
      max_factor_components: 5,
      weights: None,
    }
  }
}

/// Risk metrics for one asset. Sections degrade independently.
#[derive(Debug, Clone, Serialize)]
pub struct AssetRisk {
  pub volatility: MetricBlock<VolatilityMetrics>,
  pub value_at_risk: MetricBlock<ValueAtRisk>,
  pub drawdown: MetricBlock<DrawdownMetrics>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub benchmark: Option<MetricBlock<BenchmarkRelation>>,
}

/// Portfolio-level risk under the resolved weight vector.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioRisk {
  pub weights: Vec<f64>,
  pub annualized_volatility: f64,
  pub risk_contribution: MetricBlock<RiskContribution>,
  /// Pairwise Pearson correlations in symbol order.
  pub correlation: Vec<Vec<f64>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub factor_analysis: Option<MetricBlock<FactorAnalysis>>,
}

/// Full output of [`RiskModelEngine::calculate_risk_metrics`].
#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
  pub model: RiskModelKind,
  pub observations: usize,
  pub assets: BTreeMap<String, AssetRisk>,
  pub portfolio: MetricBlock<PortfolioRisk>,
}

/// Risk-report engine over immutable return history.
#[derive(Debug, Clone, Default)]
pub struct RiskModelEngine {
  config: RiskEngineConfig,
}

impl RiskModelEngine {
  /// Construct a new engine with explicit configuration.
  pub fn new(config: RiskEngineConfig) -> Self {
    Self { config }
  }

  /// Borrow engine configuration.
  pub fn config(&self) -> &RiskEngineConfig {
    &self.config
  }

  /// Build the full risk report. Fails only for an empty matrix or an
  /// invalid configuration; every metric failure downgrades to an inline
  /// error note.
  pub fn calculate_risk_metrics(
    &self,
    returns: &ReturnMatrix,
    benchmark: Option<&ReturnSeries>,
    model: RiskModelKind,
  ) -> Result<RiskReport, EngineError> {
    if returns.is_empty() {
      return Err(EngineError::Data("empty return matrix".to_string()));
    }
    self.validate()?;
    let weights = self.resolve_weights(returns.n_assets())?;

    let mut assets = BTreeMap::new();
    for (idx, symbol) in returns.symbols().iter().enumerate() {
      let observations = returns.column(idx).to_vec();

      let volatility = block(
        volatility::asset_volatility(
          &observations,
          self.config.rolling_window,
          self.config.ewma_decay,
          self.config.trading_days,
        ),
        symbol,
        "volatility",
      );
      let value_at_risk = block(tail::asset_value_at_risk(&observations), symbol, "value_at_risk");
      let drawdown = block(drawdown::asset_drawdown(&observations), symbol, "drawdown");

      let benchmark = benchmark.map(|bench| {
        let relation = ReturnSeries::new(returns.dates().to_vec(), observations.clone())
          .and_then(|series| {
            benchmark::relate_to_benchmark(
              &series,
              bench,
              self.config.min_benchmark_overlap,
              self.config.trading_days,
            )
          });
        block(relation, symbol, "benchmark")
      });

      assets.insert(
        symbol.clone(),
        AssetRisk {
          volatility,
          value_at_risk,
          drawdown,
          benchmark,
        },
      );
    }

    let portfolio = block(self.portfolio_risk(returns, model, &weights), "portfolio", "risk");

    Ok(RiskReport {
      model,
      observations: returns.n_observations(),
      assets,
      portfolio,
    })
  }

  fn portfolio_risk(
    &self,
    returns: &ReturnMatrix,
    model: RiskModelKind,
    weights: &[f64],
  ) -> Result<PortfolioRisk, EngineError> {
    let method = match model {
      RiskModelKind::SampleCovariance => CovarianceMethod::Sample,
      RiskModelKind::Shrinkage | RiskModelKind::FactorModel => CovarianceMethod::Shrinkage,
    };
    let sigma =
      CovarianceEstimator::with_trading_days(method, self.config.trading_days).estimate(returns)?;

    let n = weights.len();
    let mut variance = 0.0;
    for i in 0..n {
      for j in 0..n {
        variance += weights[i] * sigma.get(i, j) * weights[j];
      }
    }

    let factor_analysis = match model {
      RiskModelKind::FactorModel => Some(MetricBlock::from_result(factor::principal_components(
        returns,
        self.config.max_factor_components,
      ))),
      _ => None,
    };

    Ok(PortfolioRisk {
      weights: weights.to_vec(),
      annualized_volatility: variance.max(0.0).sqrt(),
      risk_contribution: MetricBlock::from_result(contribution::risk_contribution(
        weights,
        sigma.values(),
      )),
      correlation: correlation_matrix(returns),
      factor_analysis,
    })
  }

  fn validate(&self) -> Result<(), EngineError> {
    if self.config.ewma_decay <= 0.0 || self.config.ewma_decay >= 1.0 {
      return Err(EngineError::Configuration(format!(
        "ewma_decay must lie strictly between 0 and 1, got {}",
        self.config.ewma_decay
      )));
    }
    if self.config.rolling_window < 2 {
      return Err(EngineError::Configuration(format!(
        "rolling_window must be at least 2, got {}",
        self.config.rolling_window
      )));
    }
    if self.config.trading_days == 0 {
      return Err(EngineError::Configuration(
        "trading_days must be positive".to_string(),
      ));
    }

    Ok(())
  }

  fn resolve_weights(&self, n_assets: usize) -> Result<Vec<f64>, EngineError> {
    let Some(weights) = &self.config.weights else {
      return Ok(vec![1.0 / n_assets as f64; n_assets]);
    };

    if weights.len() != n_assets {
      return Err(EngineError::Configuration(format!(
        "{} weights supplied for {n_assets} assets",
        weights.len()
      )));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
      return Err(EngineError::Configuration(
        "portfolio weights must be finite and non-negative".to_string(),
      ));
    }
    let sum: f64 = weights.iter().sum();
    if sum <= 1e-12 {
      return Err(EngineError::Configuration(
        "portfolio weights must sum to a positive value".to_string(),
      ));
    }

    Ok(weights.iter().map(|w| w / sum).collect())
  }
}

/// Build the default-configured risk report.
pub fn calculate_risk_metrics(
  returns: &ReturnMatrix,
  benchmark: Option<&ReturnSeries>,
  model: RiskModelKind,
) -> Result<RiskReport, EngineError> {
  RiskModelEngine::default().calculate_risk_metrics(returns, benchmark, model)
}

fn block<T>(result: Result<T, EngineError>, symbol: &str, section: &str) -> MetricBlock<T> {
  if let Err(e) = &result {
    debug!(symbol, section, error = %e, "omitting metric block");
  }
  MetricBlock::from_result(result)
}

fn correlation_matrix(returns: &ReturnMatrix) -> Vec<Vec<f64>> {
  let n = returns.n_assets();
  let columns: Vec<Vec<f64>> = (0..n).map(|i| returns.column(i).to_vec()).collect();

  let mut corr = vec![vec![1.0; n]; n];
  for i in 0..n {
    for j in (i + 1)..n {
      let r = pearson(&columns[i], &columns[j]);
      corr[i][j] = r;
      corr[j][i] = r;
    }
  }

  corr
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use ndarray::Array2;
  use ndarray_rand::RandomExt;
  use rand::SeedableRng;
  use rand::rngs::StdRng;
  use rand_distr::Normal;

  use super::*;

  fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..n)
      .map(|i| start + chrono::Days::new(i as u64))
      .collect()
  }

  fn seeded_matrix(symbols: &[&str], n_obs: usize, seed: u64) -> ReturnMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Normal::new(0.0005, 0.01).unwrap();
    let values = Array2::random_using((n_obs, symbols.len()), dist, &mut rng);
    ReturnMatrix::new(
      symbols.iter().map(|s| s.to_string()).collect(),
      dates(n_obs),
      values,
    )
    .unwrap()
  }

  fn benchmark_series(n: usize) -> ReturnSeries {
    let values = (0..n)
      .map(|t| 0.0004 + 0.009 * ((t as f64) * 0.8).sin())
      .collect();
    ReturnSeries::new(dates(n), values).unwrap()
  }

  #[test]
  fn full_report_covers_assets_and_portfolio() {
    let returns = seeded_matrix(&["AAA", "BBB", "CCC"], 120, 101);
    let bench = benchmark_series(120);

    let report = calculate_risk_metrics(&returns, Some(&bench), RiskModelKind::SampleCovariance)
      .unwrap();

    assert_eq!(report.observations, 120);
    assert_eq!(report.assets.len(), 3);
    for risk in report.assets.values() {
      assert!(risk.volatility.is_available());
      assert!(risk.value_at_risk.is_available());
      assert!(risk.drawdown.is_available());
      assert!(risk.benchmark.as_ref().unwrap().is_available());
    }

    let portfolio = report.portfolio.metric().unwrap();
    assert!(portfolio.annualized_volatility > 0.0);
    for (i, row) in portfolio.correlation.iter().enumerate() {
      assert_eq!(row[i], 1.0);
    }
    let contributions = portfolio.risk_contribution.metric().unwrap();
    let total: f64 = contributions.percentage.iter().sum();
    assert!((total - 100.0).abs() < 1e-6, "{total}");
  }

  #[test]
  fn short_benchmark_overlap_degrades_to_an_error_note() {
    let returns = seeded_matrix(&["AAA", "BBB"], 60, 103);
    // Only the first 10 dates overlap with the return history.
    let bench = benchmark_series(10);

    let report =
      calculate_risk_metrics(&returns, Some(&bench), RiskModelKind::SampleCovariance).unwrap();

    for risk in report.assets.values() {
      let relation = risk.benchmark.as_ref().unwrap();
      assert!(!relation.is_available());
      assert!(relation.error().unwrap().contains("insufficient data"));
    }
  }

  #[test]
  fn factor_model_attaches_principal_components() {
    let returns = seeded_matrix(&["AAA", "BBB", "CCC", "DDD"], 150, 107);

    let with_factors =
      calculate_risk_metrics(&returns, None, RiskModelKind::FactorModel).unwrap();
    let plain =
      calculate_risk_metrics(&returns, None, RiskModelKind::SampleCovariance).unwrap();

    let portfolio = with_factors.portfolio.metric().unwrap();
    let factors = portfolio.factor_analysis.as_ref().unwrap().metric().unwrap();
    assert!(factors.components <= 5);
    assert_eq!(factors.loadings.len(), 4);

    assert!(plain.portfolio.metric().unwrap().factor_analysis.is_none());
  }

  #[test]
  fn empty_matrix_is_fatal() {
    let returns = ReturnMatrix::new(
      vec!["AAA".to_string()],
      Vec::new(),
      Array2::zeros((0, 1)),
    )
    .unwrap();

    let err = calculate_risk_metrics(&returns, None, RiskModelKind::SampleCovariance).unwrap_err();
    assert!(err.to_string().contains("insufficient data"));
  }

  #[test]
  fn explicit_weights_are_normalized_and_echoed() {
    let returns = seeded_matrix(&["AAA", "BBB"], 80, 109);
    let engine = RiskModelEngine::new(RiskEngineConfig {
      weights: Some(vec![3.0, 1.0]),
      ..RiskEngineConfig::default()
    });

    let report = engine
      .calculate_risk_metrics(&returns, None, RiskModelKind::SampleCovariance)
      .unwrap();

    let portfolio = report.portfolio.metric().unwrap();
    assert_eq!(portfolio.weights, vec![0.75, 0.25]);
  }

  #[test]
  fn mismatched_weights_are_rejected() {
    let returns = seeded_matrix(&["AAA", "BBB"], 80, 113);
    let engine = RiskModelEngine::new(RiskEngineConfig {
      weights: Some(vec![0.5, 0.3, 0.2]),
      ..RiskEngineConfig::default()
    });

    let err = engine
      .calculate_risk_metrics(&returns, None, RiskModelKind::SampleCovariance)
      .unwrap_err();
    assert!(err.to_string().contains("invalid configuration"));
  }

  #[test]
  fn single_observation_degrades_every_variance_metric() {
    let returns = ReturnMatrix::new(
      vec!["AAA".to_string(), "BBB".to_string()],
      dates(1),
      Array2::from_elem((1, 2), 0.01),
    )
    .unwrap();

    let report = calculate_risk_metrics(&returns, None, RiskModelKind::SampleCovariance).unwrap();

    let asset = &report.assets["AAA"];
    assert!(!asset.volatility.is_available());
    assert!(!asset.value_at_risk.is_available());
    assert!(asset.drawdown.is_available());
    assert!(!report.portfolio.is_available());
  }

  #[test]
  fn report_serializes_inline_error_notes() {
    let returns = ReturnMatrix::new(
      vec!["AAA".to_string()],
      dates(1),
      Array2::from_elem((1, 1), -0.02),
    )
    .unwrap();

    let report = calculate_risk_metrics(&returns, None, RiskModelKind::SampleCovariance).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["model"], "sample_covariance");
    assert!(json["assets"]["AAA"]["volatility"]["error"].is_string());
    assert!(json["assets"]["AAA"]["drawdown"]["max_drawdown"].is_number());
    assert!(json["portfolio"]["error"].is_string());
  }

  #[test]
  fn model_kind_parses_common_spellings() {
    assert_eq!(RiskModelKind::from_str("shrinkage"), RiskModelKind::Shrinkage);
    assert_eq!(RiskModelKind::from_str("Ledoit-Wolf"), RiskModelKind::Shrinkage);
    assert_eq!(RiskModelKind::from_str("factor_model"), RiskModelKind::FactorModel);
    assert_eq!(
      RiskModelKind::from_str("anything else"),
      RiskModelKind::SampleCovariance
    );
  }
}
