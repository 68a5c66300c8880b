//! Tail-shape ratios of the daily return distribution.

use serde::Serialize;

use super::guarded_ratio;
use crate::error::EngineError;
use crate::stats::percentile;

/// Asymmetry of gains against losses.
#[derive(Debug, Clone, Serialize)]
pub struct TailMetrics {
  /// 95th percentile over the magnitude of the 5th.
  pub tail_ratio: f64,
  /// Summed gains over summed loss magnitudes.
  pub gain_to_pain: f64,
  /// Probability-weighted gains above the threshold over losses below it.
  pub omega_ratio: f64,
}

pub(crate) fn tail_metrics(xs: &[f64], threshold: f64) -> Result<TailMetrics, EngineError> {
  if xs.len() < 2 {
    return Err(EngineError::Data(format!(
      "{} observations, need at least 2 for tail metrics",
      xs.len()
    )));
  }

  let p95 = percentile(xs, 95.0);
  let p5 = percentile(xs, 5.0);

  let gains: f64 = xs.iter().filter(|&&r| r > 0.0).sum();
  let pain: f64 = xs.iter().filter(|&&r| r < 0.0).map(|r| -r).sum();

  let above: f64 = xs.iter().map(|r| (r - threshold).max(0.0)).sum();
  let below: f64 = xs.iter().map(|r| (threshold - r).max(0.0)).sum();

  Ok(TailMetrics {
    tail_ratio: guarded_ratio(p95, p5.abs()),
    gain_to_pain: guarded_ratio(gains, pain),
    omega_ratio: guarded_ratio(above, below),
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn balanced_gains_and_losses_hand_check() {
    let xs = [0.02, -0.01, 0.03, -0.02, 0.01];
    let metrics = tail_metrics(&xs, 0.0).unwrap();

    assert_relative_eq!(metrics.gain_to_pain, 2.0, epsilon = 1e-12);
    assert_relative_eq!(metrics.omega_ratio, 2.0, epsilon = 1e-12);
    assert_relative_eq!(metrics.tail_ratio, 0.028 / 0.018, epsilon = 1e-9);
  }

  #[test]
  fn loss_free_history_guards_the_denominators() {
    let xs = [0.01, 0.02, 0.005, 0.015];
    let metrics = tail_metrics(&xs, 0.0).unwrap();

    assert_eq!(metrics.gain_to_pain, 0.0);
    assert_eq!(metrics.omega_ratio, 0.0);
    assert!(metrics.tail_ratio > 0.0);
  }

  #[test]
  fn omega_threshold_moves_the_cut() {
    let xs = [0.02, -0.01, 0.03, -0.02, 0.01];
    let at_zero = tail_metrics(&xs, 0.0).unwrap();
    let at_one_percent = tail_metrics(&xs, 0.01).unwrap();

    assert!(at_one_percent.omega_ratio < at_zero.omega_ratio);
  }

  #[test]
  fn single_observation_is_rejected() {
    assert!(tail_metrics(&[0.01], 0.0).is_err());
  }
}
