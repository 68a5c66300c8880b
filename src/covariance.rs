//! # Covariance
//!
//! $$
//! \Sigma = \mathrm{Cov}(r) \times 252
//! $$
//!
//! Annualized covariance estimation: sample, EWMA and Ledoit-Wolf shrinkage.

mod ewma;
mod sample;
mod shrinkage;

use nalgebra::DMatrix;
use ndarray::Array2;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;
use tracing::debug;

use crate::error::EngineError;
use crate::series::ReturnMatrix;
use crate::TRADING_DAYS_PER_YEAR;

/// RiskMetrics daily decay.
pub const DEFAULT_EWMA_DECAY: f64 = 0.94;

const PSD_TOLERANCE: f64 = 1e-8;

/// Covariance estimation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovarianceMethod {
  /// Annualized sample covariance (ddof = 1).
  Sample,
  /// Exponentially weighted covariance with the given decay.
  Ewma { decay: f64 },
  /// Ledoit-Wolf shrinkage toward the scaled identity target.
  Shrinkage,
}

impl Default for CovarianceMethod {
  fn default() -> Self {
    Self::Sample
  }
}

impl CovarianceMethod {
  /// Parse a string into a [`CovarianceMethod`].
  pub fn from_str(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "ewma" => Self::Ewma {
        decay: DEFAULT_EWMA_DECAY,
      },
      "shrinkage" | "ledoit-wolf" | "ledoitwolf" => Self::Shrinkage,
      _ => Self::Sample,
    }
  }
}

/// Square, symmetric, annualized covariance estimate.
#[derive(Debug, Clone, Serialize)]
pub struct CovarianceMatrix {
  symbols: Vec<String>,
  #[serde(serialize_with = "serialize_rows")]
  values: Array2<f64>,
  annualized: bool,
}

fn serialize_rows<S>(values: &Array2<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
  S: Serializer,
{
  let rows: Vec<Vec<f64>> = values.outer_iter().map(|r| r.to_vec()).collect();
  rows.serialize(serializer)
}

impl CovarianceMatrix {
  pub fn symbols(&self) -> &[String] {
    &self.symbols
  }

  pub fn values(&self) -> &Array2<f64> {
    &self.values
  }

  pub fn n_assets(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_annualized(&self) -> bool {
    self.annualized
  }

  pub fn get(&self, i: usize, j: usize) -> f64 {
    self.values[(i, j)]
  }

  /// nalgebra view for inversion and eigen work.
  pub fn to_dmatrix(&self) -> DMatrix<f64> {
    let n = self.values.nrows();
    DMatrix::from_fn(n, n, |i, j| self.values[(i, j)])
  }
}

/// Estimator holding the method and annualization horizon.
#[derive(Debug, Clone, Copy)]
pub struct CovarianceEstimator {
  method: CovarianceMethod,
  trading_days: usize,
}

impl CovarianceEstimator {
  pub fn new(method: CovarianceMethod) -> Self {
    Self {
      method,
      trading_days: TRADING_DAYS_PER_YEAR,
    }
  }

  pub fn with_trading_days(method: CovarianceMethod, trading_days: usize) -> Self {
    Self {
      method,
      trading_days,
    }
  }

  pub fn method(&self) -> CovarianceMethod {
    self.method
  }

  pub fn estimate(&self, returns: &ReturnMatrix) -> Result<CovarianceMatrix, EngineError> {
    if returns.is_empty() {
      return Err(EngineError::Data("empty return matrix".to_string()));
    }
    if returns.n_observations() < 2 {
      return Err(EngineError::Data(format!(
        "at least 2 return observations required, got {}",
        returns.n_observations()
      )));
    }

    let daily = match self.method {
      CovarianceMethod::Sample => sample::daily_sample_covariance(returns.values()),
      CovarianceMethod::Ewma { decay } => {
        if decay <= 0.0 || decay >= 1.0 {
          return Err(EngineError::Configuration(format!(
            "ewma decay must be in (0, 1), got {decay}"
          )));
        }
        ewma::daily_ewma_covariance(returns.values(), decay)
      }
      CovarianceMethod::Shrinkage => {
        let (cov, delta) = shrinkage::daily_ledoit_wolf(returns.values());
        debug!(intensity = delta, "applied ledoit-wolf shrinkage");
        cov
      }
    };

    let values = daily * self.trading_days as f64;
    check_positive_semi_definite(&values)?;

    Ok(CovarianceMatrix {
      symbols: returns.symbols().to_vec(),
      values,
      annualized: true,
    })
  }
}

/// One-shot estimation with the default annualization horizon.
pub fn estimate_covariance(
  returns: &ReturnMatrix,
  method: CovarianceMethod,
) -> Result<CovarianceMatrix, EngineError> {
  CovarianceEstimator::new(method).estimate(returns)
}

pub(crate) fn check_positive_semi_definite(values: &Array2<f64>) -> Result<(), EngineError> {
  let n = values.nrows();
  let m = DMatrix::from_fn(n, n, |i, j| values[(i, j)]);
  let eigen = m.symmetric_eigen();
  let smallest = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);

  if !smallest.is_finite() || smallest < -PSD_TOLERANCE {
    return Err(EngineError::Numerical(format!(
      "covariance matrix is not positive semi-definite (smallest eigenvalue {smallest:.3e}); \
       re-estimate with the shrinkage method"
    )));
  }

  Ok(())
}
