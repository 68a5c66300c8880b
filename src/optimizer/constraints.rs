//! # Optimizer Constraints
//!
//! Validated constraint set: per-asset bounds, target return and cash budget.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::error::EngineError;

/// Long-only weight bounds plus optional target return and cash budget.
///
/// `sectors` is accepted for forward compatibility but not yet enforced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Constraints {
  pub max_weight: f64,
  pub min_weight: f64,
  pub target_return: Option<f64>,
  pub total_value: Option<f64>,
  pub sectors: BTreeMap<String, String>,
}

impl Default for Constraints {
  fn default() -> Self {
    Self {
      max_weight: 1.0,
      min_weight: 0.0,
      target_return: None,
      total_value: None,
      sectors: BTreeMap::new(),
    }
  }
}

impl Constraints {
  pub fn validate(&self) -> Result<(), EngineError> {
    if !self.min_weight.is_finite() || self.min_weight < 0.0 {
      return Err(EngineError::Configuration(format!(
        "min_weight must be a finite value >= 0, got {}",
        self.min_weight
      )));
    }
    if !self.max_weight.is_finite() || self.max_weight > 1.0 {
      return Err(EngineError::Configuration(format!(
        "max_weight must be a finite value <= 1 for long-only portfolios, got {}",
        self.max_weight
      )));
    }
    if self.min_weight > self.max_weight {
      return Err(EngineError::Configuration(format!(
        "min_weight {} exceeds max_weight {}",
        self.min_weight, self.max_weight
      )));
    }
    if let Some(target) = self.target_return {
      if !target.is_finite() {
        return Err(EngineError::Configuration(
          "target_return must be finite".to_string(),
        ));
      }
    }
    if let Some(value) = self.total_value {
      if !value.is_finite() || value <= 0.0 {
        return Err(EngineError::Configuration(format!(
          "total_value must be a finite value > 0, got {value}"
        )));
      }
    }

    Ok(())
  }

  /// Bounds must leave room for weights summing to one over `n_assets`.
  pub fn check_feasible(&self, n_assets: usize) -> Result<(), EngineError> {
    let n = n_assets as f64;
    if self.min_weight * n > 1.0 + 1e-9 {
      return Err(EngineError::Configuration(format!(
        "min_weight {} over {n_assets} assets cannot sum to 1",
        self.min_weight
      )));
    }
    if self.max_weight * n < 1.0 - 1e-9 {
      return Err(EngineError::Configuration(format!(
        "max_weight {} over {n_assets} assets cannot sum to 1",
        self.max_weight
      )));
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::Constraints;

  #[test]
  fn defaults_are_valid() {
    let constraints = Constraints::default();
    assert!(constraints.validate().is_ok());
    assert!(constraints.check_feasible(1).is_ok());
    assert_eq!(constraints.max_weight, 1.0);
    assert_eq!(constraints.min_weight, 0.0);
  }

  #[test]
  fn inverted_bounds_are_rejected() {
    let constraints = Constraints {
      min_weight: 0.6,
      max_weight: 0.4,
      ..Constraints::default()
    };
    let err = constraints.validate().unwrap_err();
    assert!(err.to_string().contains("invalid configuration"));
  }

  #[test]
  fn infeasible_bound_sums_are_rejected() {
    let too_tight_min = Constraints {
      min_weight: 0.4,
      ..Constraints::default()
    };
    assert!(too_tight_min.check_feasible(3).is_err());

    let too_tight_max = Constraints {
      max_weight: 0.2,
      ..Constraints::default()
    };
    assert!(too_tight_max.check_feasible(3).is_err());

    let feasible = Constraints {
      min_weight: 0.1,
      max_weight: 0.5,
      ..Constraints::default()
    };
    assert!(feasible.check_feasible(3).is_ok());
  }

  #[test]
  fn unknown_keys_are_rejected_when_deserializing() {
    let err = serde_json::from_str::<Constraints>(r#"{"max_weight": 0.5, "max_weigth": 0.5}"#);
    assert!(err.is_err());

    let ok: Constraints = serde_json::from_str(r#"{"min_weight": 0.05}"#).unwrap();
    assert_eq!(ok.min_weight, 0.05);
    assert_eq!(ok.max_weight, 1.0);
  }
}
