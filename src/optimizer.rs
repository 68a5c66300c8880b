//! # Portfolio Optimizer
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Constrained weight optimization over historical returns, with optional
//! whole-share allocation under a cash budget.

mod allocation;
mod constraints;
mod solver;

use std::collections::BTreeMap;

use nalgebra::DVector;
use ndarray::Array1;
use ndarray::Array2;
use ndarray_stats::QuantileExt;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::warn;

pub use constraints::Constraints;
#[cfg(feature = "nelder-mead")]
pub use solver::NelderMeadSolver;
pub use solver::GradientDescentSolver;
pub use solver::SolverChoice;
pub use solver::WeightSolver;

use crate::covariance::CovarianceEstimator;
use crate::covariance::CovarianceMatrix;
use crate::covariance::CovarianceMethod;
use crate::error::EngineError;
use crate::series::ReturnMatrix;
use crate::TRADING_DAYS_PER_YEAR;

/// Squared-deviation penalty tying portfolio return to the requested target.
const RETURN_PENALTY: f64 = 10.0;

/// Supported optimization objectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
  /// Maximize (expected return - risk-free) / volatility.
  #[default]
  #[serde(rename = "sharpe")]
  MaxSharpe,
  /// Minimize portfolio variance.
  MinVolatility,
  /// Minimize variance subject to a return target.
  TargetReturn,
}

impl Objective {
  /// Parse a string into an [`Objective`].
  pub fn from_str(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "min_volatility" | "min-volatility" | "minvol" => Self::MinVolatility,
      "target_return" | "target-return" | "target" => Self::TargetReturn,
      _ => Self::MaxSharpe,
    }
  }
}

/// Optimizer configuration. Expected returns use the annualized historical
/// mean, a deliberately naive estimator.
#[derive(Debug, Clone, Copy)]
pub struct OptimizerConfig {
  /// Annualized risk-free rate used by the Sharpe objective.
  pub risk_free_rate: f64,
  /// Trading days per year for annualization.
  pub trading_days: usize,
  /// Iterative backend selection.
  pub solver: SolverChoice,
  /// Iteration cap per solver attempt.
  pub max_iters: u64,
  /// Bound widening factor for the single non-convergence retry.
  pub relax_factor: f64,
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    Self {
      risk_free_rate: 0.02,
      trading_days: TRADING_DAYS_PER_YEAR,
      solver: SolverChoice::Auto,
      max_iters: 5000,
      relax_factor: 1.5,
    }
  }
}

/// Immutable output of one `optimize` call.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
  pub symbols: Vec<String>,
  /// Final weights, summing to 1 within 1e-6 and inside the bounds.
  pub weights: Vec<f64>,
  pub expected_return: f64,
  pub volatility: f64,
  pub sharpe_ratio: f64,
  /// Whole shares per symbol when prices and a budget were supplied.
  pub allocation: BTreeMap<String, u64>,
  pub leftover_cash: f64,
  /// False when the equal-weight fallback was used.
  pub converged: bool,
  pub warnings: Vec<String>,
}

/// One point of the efficient frontier.
#[derive(Debug, Clone, Serialize)]
pub struct FrontierPoint {
  pub target_return: f64,
  pub expected_return: f64,
  pub volatility: f64,
  pub weights: Vec<f64>,
}

/// Weight optimizer over an objective and a validated constraint set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortfolioOptimizer {
  config: OptimizerConfig,
}

impl PortfolioOptimizer {
  pub fn new(config: OptimizerConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &OptimizerConfig {
    &self.config
  }

  /// Solve for weights only; the allocation block stays empty.
  pub fn optimize(
    &self,
    returns: &ReturnMatrix,
    objective: Objective,
    constraints: &Constraints,
  ) -> Result<OptimizationResult, EngineError> {
    let (backend, warnings) = self.resolve_backend()?;
    self.optimize_with_backend(returns, objective, constraints, None, backend.as_ref(), warnings)
  }

  /// Solve for weights and convert them to whole shares when
  /// `constraints.total_value` is set.
  pub fn optimize_with_prices(
    &self,
    returns: &ReturnMatrix,
    prices: &BTreeMap<String, f64>,
    objective: Objective,
    constraints: &Constraints,
  ) -> Result<OptimizationResult, EngineError> {
    let (backend, warnings) = self.resolve_backend()?;
    self.optimize_with_backend(
      returns,
      objective,
      constraints,
      Some(prices),
      backend.as_ref(),
      warnings,
    )
  }

  /// Minimum-volatility solves across a sweep of return targets between the
  /// least and greatest per-asset expected return. Infeasible targets are
  /// skipped rather than failing the sweep.
  pub fn efficient_frontier(
    &self,
    returns: &ReturnMatrix,
    n_points: usize,
    constraints: &Constraints,
  ) -> Result<Vec<FrontierPoint>, EngineError> {
    if n_points < 2 {
      return Err(EngineError::Configuration(format!(
        "efficient frontier needs at least 2 points, got {n_points}"
      )));
    }
    if returns.is_empty() {
      return Err(EngineError::Data("empty return matrix".to_string()));
    }

    let mu = Array1::from_vec(annualized_means(returns, self.config.trading_days));
    let lo_ret = *mu
      .min()
      .map_err(|e| EngineError::Numerical(format!("expected return range: {e}")))?;
    let hi_ret = *mu
      .max()
      .map_err(|e| EngineError::Numerical(format!("expected return range: {e}")))?;

    let mut points = Vec::with_capacity(n_points);
    for k in 0..n_points {
      let target = lo_ret + (hi_ret - lo_ret) * k as f64 / (n_points - 1) as f64;
      let mut point_constraints = constraints.clone();
      point_constraints.target_return = Some(target);

      match self.optimize(returns, Objective::TargetReturn, &point_constraints) {
        Ok(res) => points.push(FrontierPoint {
          target_return: target,
          expected_return: res.expected_return,
          volatility: res.volatility,
          weights: res.weights,
        }),
        Err(e) => debug!(error = %e, target, "skipping infeasible frontier point"),
      }
    }

    if points.is_empty() {
      return Err(EngineError::Numerical(
        "no feasible frontier points".to_string(),
      ));
    }

    Ok(points)
  }

  /// An unavailable backend downgrades to the native one with a warning
  /// instead of failing the call.
  fn resolve_backend(&self) -> Result<(Box<dyn WeightSolver>, Vec<String>), EngineError> {
    match solver::make_solver(self.config.solver) {
      Ok(backend) => Ok((backend, Vec::new())),
      Err(EngineError::DependencyUnavailable(msg)) => {
        warn!("{msg}; falling back to the native gradient-descent backend");
        Ok((
          Box::new(GradientDescentSolver),
          vec![format!("{msg}; used native gradient-descent backend")],
        ))
      }
      Err(e) => Err(e),
    }
  }

  pub(crate) fn optimize_with_backend(
    &self,
    returns: &ReturnMatrix,
    objective: Objective,
    constraints: &Constraints,
    prices: Option<&BTreeMap<String, f64>>,
    backend: &dyn WeightSolver,
    mut warnings: Vec<String>,
  ) -> Result<OptimizationResult, EngineError> {
    if returns.is_empty() {
      return Err(EngineError::Data("empty return matrix".to_string()));
    }
    constraints.validate()?;
    let n = returns.n_assets();
    constraints.check_feasible(n)?;

    let target = match (objective, constraints.target_return) {
      (Objective::TargetReturn, None) => {
        return Err(EngineError::Configuration(
          "target_return objective requires constraints.target_return".to_string(),
        ));
      }
      (Objective::TargetReturn, Some(t)) => t,
      _ => 0.0,
    };

    let estimator =
      CovarianceEstimator::with_trading_days(CovarianceMethod::Sample, self.config.trading_days);
    let sigma = estimator.estimate(returns)?;
    let mu = annualized_means(returns, self.config.trading_days);

    let lo = constraints.min_weight;
    let hi = constraints.max_weight;

    let mut converged = true;
    let weights = if n == 1 {
      vec![1.0]
    } else if objective == Objective::MinVolatility {
      match closed_form_min_volatility(&sigma, lo, hi) {
        Some(w) => w,
        None => {
          debug!("closed-form minimum-volatility solution rejected; using the iterative solver");
          self.solve_iteratively(
            objective,
            &mu,
            &sigma,
            target,
            lo,
            hi,
            backend,
            &mut warnings,
            &mut converged,
          )
        }
      }
    } else {
      self.solve_iteratively(
        objective,
        &mu,
        &sigma,
        target,
        lo,
        hi,
        backend,
        &mut warnings,
        &mut converged,
      )
    };

    let (expected_return, volatility, sharpe_ratio) = portfolio_stats(
      &weights,
      &mu,
      sigma.values(),
      self.config.risk_free_rate,
    );

    let (allocation, leftover_cash) = match (prices, constraints.total_value) {
      (Some(prices), Some(total_value)) => {
        let missing: Vec<String> = returns
          .symbols()
          .iter()
          .filter(|s| !prices.get(*s).map(|p| p.is_finite() && *p > 0.0).unwrap_or(false))
          .cloned()
          .collect();

        if missing.is_empty() {
          allocation::allocate_discrete(returns.symbols(), &weights, prices, total_value)
        } else {
          let msg = format!(
            "missing or invalid prices for {}; discrete allocation skipped",
            missing.join(", ")
          );
          warn!("{msg}");
          warnings.push(msg);
          (BTreeMap::new(), total_value)
        }
      }
      _ => (BTreeMap::new(), 0.0),
    };

    Ok(OptimizationResult {
      symbols: returns.symbols().to_vec(),
      weights,
      expected_return,
      volatility,
      sharpe_ratio,
      allocation,
      leftover_cash,
      converged,
      warnings,
    })
  }

  #[allow(clippy::too_many_arguments)]
  fn solve_iteratively(
    &self,
    objective: Objective,
    mu: &[f64],
    sigma: &CovarianceMatrix,
    target: f64,
    lo: f64,
    hi: f64,
    backend: &dyn WeightSolver,
    warnings: &mut Vec<String>,
    converged: &mut bool,
  ) -> Vec<f64> {
    let n = mu.len();
    debug!(backend = backend.name(), "running iterative weight search");

    let cost = make_cost(
      objective,
      mu,
      sigma.values(),
      self.config.risk_free_rate,
      target,
      lo,
      hi,
    );
    match backend.solve(n, cost.as_ref(), self.config.max_iters) {
      Ok(x) if cost(&x).is_finite() => return solver::map_to_weights(&x, lo, hi),
      Ok(_) => warn!("solver returned a non-finite cost; retrying with relaxed bounds"),
      Err(e) => warn!(error = %e, "solver attempt failed; retrying with relaxed bounds"),
    }

    let relax = self.config.relax_factor.max(1.0);
    let lo_relaxed = (lo / relax).max(0.0);
    let hi_relaxed = (hi * relax).min(1.0);
    warnings.push("solver retried with relaxed bounds".to_string());

    let relaxed_cost = make_cost(
      objective,
      mu,
      sigma.values(),
      self.config.risk_free_rate,
      target,
      lo_relaxed,
      hi_relaxed,
    );
    match backend.solve(n, relaxed_cost.as_ref(), self.config.max_iters) {
      Ok(x) if relaxed_cost(&x).is_finite() => solver::map_to_weights(&x, lo, hi),
      _ => {
        warn!("solver did not converge after a relaxed-bounds retry; falling back to equal weights");
        warnings.push("solver did not converge; fell back to equal weights".to_string());
        *converged = false;
        vec![1.0 / n as f64; n]
      }
    }
  }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
  a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn quad_form(cov: &Array2<f64>, w: &[f64]) -> f64 {
  let n = w.len();
  let mut acc = 0.0;
  for i in 0..n {
    for j in 0..n {
      acc += w[i] * cov[(i, j)] * w[j];
    }
  }
  acc
}

fn annualized_means(returns: &ReturnMatrix, trading_days: usize) -> Vec<f64> {
  (0..returns.n_assets())
    .map(|i| {
      let col = returns.column(i);
      col.sum() / col.len() as f64 * trading_days as f64
    })
    .collect()
}

fn portfolio_stats(w: &[f64], mu: &[f64], cov: &Array2<f64>, risk_free: f64) -> (f64, f64, f64) {
  let expected_return = dot(w, mu);
  let volatility = quad_form(cov, w).max(0.0).sqrt();
  let sharpe = if volatility > 1e-15 {
    (expected_return - risk_free) / volatility
  } else {
    0.0
  };

  (expected_return, volatility, sharpe)
}

/// Global minimum-variance weights `Σ^{-1} 1 / (1' Σ^{-1} 1)`, accepted only
/// when every weight already sits inside the bounds. Bit-for-bit
/// reproducible, unlike an iterative search.
fn closed_form_min_volatility(cov: &CovarianceMatrix, lo: f64, hi: f64) -> Option<Vec<f64>> {
  let inv = cov.to_dmatrix().try_inverse()?;
  let ones = DVector::from_element(cov.n_assets(), 1.0);
  let v = &inv * &ones;

  let denom = v.sum();
  if !denom.is_finite() || denom.abs() < 1e-15 {
    return None;
  }

  let w: Vec<f64> = v.iter().map(|x| x / denom).collect();
  if w.iter().all(|&x| x.is_finite() && x >= lo && x <= hi) {
    Some(w)
  } else {
    None
  }
}

fn make_cost<'a>(
  objective: Objective,
  mu: &'a [f64],
  cov: &'a Array2<f64>,
  risk_free: f64,
  target: f64,
  lo: f64,
  hi: f64,
) -> Box<dyn Fn(&[f64]) -> f64 + 'a> {
  match objective {
    Objective::MaxSharpe => Box::new(move |x| {
      let w = solver::map_to_weights(x, lo, hi);
      let ret = dot(&w, mu);
      let vol = quad_form(cov, &w).max(0.0).sqrt();
      if vol > 1e-15 {
        -(ret - risk_free) / vol
      } else {
        1e6
      }
    }),
    Objective::MinVolatility => Box::new(move |x| {
      let w = solver::map_to_weights(x, lo, hi);
      quad_form(cov, &w)
    }),
    Objective::TargetReturn => Box::new(move |x| {
      let w = solver::map_to_weights(x, lo, hi);
      let ret = dot(&w, mu);
      quad_form(cov, &w) + RETURN_PENALTY * (ret - target).powi(2)
    }),
  }
}
