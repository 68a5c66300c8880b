//! Drawdown statistics over the compounded wealth curve.
//!
//! $$
//! D_t = \frac{W_t}{\max_{s \le t} W_s} - 1, \qquad W_t = \prod_{i \le t}(1+r_i)
//! $$

use serde::Serialize;

use crate::error::EngineError;

/// Drawdown profile of a single return stream. All drawdowns are `<= 0`.
#[derive(Debug, Clone, Serialize)]
pub struct DrawdownMetrics {
  /// Deepest peak-to-trough decline.
  pub max_drawdown: f64,
  /// Drawdown at the last observation.
  pub current_drawdown: f64,
  /// Mean over the underwater observations.
  pub average_drawdown: f64,
  /// Mean length of the underwater episodes, in observations.
  pub average_duration: f64,
  /// Mean trough-to-recovery length over the completed episodes.
  pub average_recovery: f64,
}

pub(crate) fn asset_drawdown(xs: &[f64]) -> Result<DrawdownMetrics, EngineError> {
  let curve = drawdown_curve(xs)?;

  let max_drawdown = curve.iter().cloned().fold(0.0, f64::min);
  let current_drawdown = *curve.last().unwrap_or(&0.0);

  let underwater: Vec<f64> = curve.iter().copied().filter(|&d| d < 0.0).collect();
  let average_drawdown = if underwater.is_empty() {
    0.0
  } else {
    underwater.iter().sum::<f64>() / underwater.len() as f64
  };

  let (average_duration, average_recovery) = episode_stats(&curve);

  Ok(DrawdownMetrics {
    max_drawdown,
    current_drawdown,
    average_drawdown,
    average_duration,
    average_recovery,
  })
}

/// Per-observation drawdown of the wealth curve started at 1.
pub(crate) fn drawdown_curve(xs: &[f64]) -> Result<Vec<f64>, EngineError> {
  if xs.is_empty() {
    return Err(EngineError::Data(
      "no observations for the drawdown curve".to_string(),
    ));
  }

  let mut wealth = 1.0;
  let mut peak: f64 = 1.0;
  let mut curve = Vec::with_capacity(xs.len());
  for r in xs {
    wealth *= 1.0 + r;
    peak = peak.max(wealth);
    curve.push(wealth / peak - 1.0);
  }

  Ok(curve)
}

/// Deepest drawdown of each underwater episode, open episodes included.
pub(crate) fn episode_troughs(curve: &[f64]) -> Vec<f64> {
  let mut troughs = Vec::new();
  let mut current: Option<f64> = None;

  for &d in curve {
    if d < 0.0 {
      current = Some(current.map_or(d, |t: f64| t.min(d)));
    } else if let Some(t) = current.take() {
      troughs.push(t);
    }
  }
  if let Some(t) = current {
    troughs.push(t);
  }

  troughs
}

/// Mean underwater-episode length and mean trough-to-recovery time. Episodes
/// still open at the end count toward duration but not recovery.
fn episode_stats(curve: &[f64]) -> (f64, f64) {
  let mut durations = Vec::new();
  let mut recoveries = Vec::new();

  let mut start: Option<usize> = None;
  let mut trough_idx = 0;
  let mut trough = 0.0;

  for (i, &d) in curve.iter().enumerate() {
    if d < 0.0 {
      if start.is_none() {
        start = Some(i);
        trough_idx = i;
        trough = d;
      } else if d < trough {
        trough_idx = i;
        trough = d;
      }
    } else if let Some(s) = start.take() {
      durations.push((i - s) as f64);
      recoveries.push((i - trough_idx) as f64);
    }
  }
  if let Some(s) = start {
    durations.push((curve.len() - s) as f64);
  }

  let mean = |v: &[f64]| {
    if v.is_empty() {
      0.0
    } else {
      v.iter().sum::<f64>() / v.len() as f64
    }
  };

  (mean(&durations), mean(&recoveries))
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  #[test]
  fn drawdowns_track_the_wealth_curve() {
    let xs = [0.1, -0.2, 0.05, 0.25, -0.1];
    let metrics = asset_drawdown(&xs).unwrap();

    // Peak 1.1, trough 0.88, full recovery at 1.155, then -10%.
    assert_relative_eq!(metrics.max_drawdown, -0.2, epsilon = 1e-12);
    assert_relative_eq!(metrics.current_drawdown, -0.1, epsilon = 1e-12);
    assert_relative_eq!(
      metrics.average_drawdown,
      (-0.2 + 0.88 * 1.05 / 1.1 - 1.0 - 0.1) / 3.0,
      epsilon = 1e-12
    );
  }

  #[test]
  fn durations_count_open_episodes_but_recoveries_do_not() {
    let xs = [0.1, -0.2, 0.05, 0.25, -0.1];
    let metrics = asset_drawdown(&xs).unwrap();

    // One closed episode of 2 observations, one open of 1.
    assert_relative_eq!(metrics.average_duration, 1.5, epsilon = 1e-12);
    // Trough at the second observation, recovered two observations later.
    assert_relative_eq!(metrics.average_recovery, 2.0, epsilon = 1e-12);
  }

  #[test]
  fn monotonic_gains_never_draw_down() {
    let xs = [0.01, 0.02, 0.005, 0.015];
    let metrics = asset_drawdown(&xs).unwrap();

    assert_eq!(metrics.max_drawdown, 0.0);
    assert_eq!(metrics.current_drawdown, 0.0);
    assert_eq!(metrics.average_drawdown, 0.0);
    assert_eq!(metrics.average_duration, 0.0);
    assert_eq!(metrics.average_recovery, 0.0);
  }

  #[test]
  fn max_drawdown_is_never_positive() {
    let xs = [0.3, -0.5, 0.8, -0.02, 0.01];
    let metrics = asset_drawdown(&xs).unwrap();
    assert!(metrics.max_drawdown <= 0.0);
    assert!(metrics.max_drawdown <= metrics.current_drawdown);
  }

  #[test]
  fn empty_series_is_rejected() {
    assert!(asset_drawdown(&[]).is_err());
  }

  #[test]
  fn troughs_capture_each_episode_minimum() {
    let curve = [0.0, -0.2, -0.16, 0.0, -0.1];
    assert_eq!(episode_troughs(&curve), vec![-0.2, -0.1]);
  }
}
