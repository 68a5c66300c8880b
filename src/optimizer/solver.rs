//! # Weight Solvers
//!
//! $$
//! w_i = \frac{e^{x_i}}{\sum_j e^{x_j}}
//! $$
//!
//! Pluggable minimizers over an unconstrained parameterization. Candidate
//! points are mapped through a softmax onto the simplex and projected onto
//! the configured weight bounds.

#[cfg(feature = "nelder-mead")]
use argmin::core::CostFunction;
#[cfg(feature = "nelder-mead")]
use argmin::core::Executor;
#[cfg(feature = "nelder-mead")]
use argmin::solver::neldermead::NelderMead;
use serde::Deserialize;
use serde::Serialize;

use crate::error::EngineError;

/// Backend selection for the iterative weight search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverChoice {
  /// Nelder-Mead when the feature is compiled in, gradient descent otherwise.
  #[default]
  Auto,
  NelderMead,
  GradientDescent,
}

impl SolverChoice {
  /// Parse a string into a [`SolverChoice`].
  pub fn from_str(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "nelder-mead" | "neldermead" | "nm" => Self::NelderMead,
      "gradient-descent" | "gradientdescent" | "gd" => Self::GradientDescent,
      _ => Self::Auto,
    }
  }
}

/// Minimizes a cost over unconstrained parameters, returning the best point.
pub trait WeightSolver {
  fn name(&self) -> &'static str;

  fn solve(
    &self,
    n_assets: usize,
    cost: &dyn Fn(&[f64]) -> f64,
    max_iters: u64,
  ) -> Result<Vec<f64>, EngineError>;
}

/// Resolve the configured backend.
///
/// Requesting Nelder-Mead without the `nelder-mead` feature reports
/// [`EngineError::DependencyUnavailable`]; callers fall back to the native
/// backend instead of failing.
pub(crate) fn make_solver(choice: SolverChoice) -> Result<Box<dyn WeightSolver>, EngineError> {
  match choice {
    SolverChoice::GradientDescent => Ok(Box::new(GradientDescentSolver)),
    SolverChoice::NelderMead => {
      #[cfg(feature = "nelder-mead")]
      {
        Ok(Box::new(NelderMeadSolver))
      }
      #[cfg(not(feature = "nelder-mead"))]
      {
        Err(EngineError::DependencyUnavailable(
          "nelder-mead solver requires the `nelder-mead` feature".to_string(),
        ))
      }
    }
    SolverChoice::Auto => {
      #[cfg(feature = "nelder-mead")]
      {
        Ok(Box::new(NelderMeadSolver))
      }
      #[cfg(not(feature = "nelder-mead"))]
      {
        Ok(Box::new(GradientDescentSolver))
      }
    }
  }
}

/// Nelder-Mead simplex search backed by `argmin`.
#[cfg(feature = "nelder-mead")]
pub struct NelderMeadSolver;

#[cfg(feature = "nelder-mead")]
impl WeightSolver for NelderMeadSolver {
  fn name(&self) -> &'static str {
    "nelder-mead"
  }

  fn solve(
    &self,
    n_assets: usize,
    cost: &dyn Fn(&[f64]) -> f64,
    max_iters: u64,
  ) -> Result<Vec<f64>, EngineError> {
    struct ClosureCost<'a> {
      f: &'a dyn Fn(&[f64]) -> f64,
    }

    impl CostFunction for ClosureCost<'_> {
      type Param = Vec<f64>;
      type Output = f64;

      fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        Ok((self.f)(x))
      }
    }

    let x0 = vec![0.0; n_assets];
    let mut simplex = Vec::with_capacity(n_assets + 1);
    simplex.push(x0.clone());
    for i in 0..n_assets {
      let mut point = x0.clone();
      point[i] = 1.0;
      simplex.push(point);
    }

    let solver = NelderMead::new(simplex)
      .with_sd_tolerance(1e-8)
      .map_err(|e| EngineError::Numerical(format!("nelder-mead setup failed: {e}")))?;

    let res = Executor::new(ClosureCost { f: cost }, solver)
      .configure(|state| state.max_iters(max_iters))
      .run()
      .map_err(|e| EngineError::Numerical(format!("nelder-mead failed: {e}")))?;

    if !res.state.best_cost.is_finite() {
      return Err(EngineError::Numerical(
        "nelder-mead produced a non-finite best cost".to_string(),
      ));
    }

    Ok(res.state.best_param.unwrap_or(x0))
  }
}

/// Native fixed-step descent with a central-difference gradient and
/// backtracking line search. Always available.
pub struct GradientDescentSolver;

impl WeightSolver for GradientDescentSolver {
  fn name(&self) -> &'static str {
    "gradient-descent"
  }

  fn solve(
    &self,
    n_assets: usize,
    cost: &dyn Fn(&[f64]) -> f64,
    max_iters: u64,
  ) -> Result<Vec<f64>, EngineError> {
    let h = 1e-5;
    let mut x = vec![0.0; n_assets];
    let mut fx = cost(&x);
    if !fx.is_finite() {
      return Err(EngineError::Numerical(
        "cost is non-finite at the initial point".to_string(),
      ));
    }

    let mut grad = vec![0.0; n_assets];
    for _ in 0..max_iters {
      for i in 0..n_assets {
        let orig = x[i];
        x[i] = orig + h;
        let fp = cost(&x);
        x[i] = orig - h;
        let fm = cost(&x);
        x[i] = orig;
        grad[i] = (fp - fm) / (2.0 * h);
      }

      let grad_norm_sq: f64 = grad.iter().map(|g| g * g).sum();
      if !grad_norm_sq.is_finite() {
        return Err(EngineError::Numerical(
          "gradient became non-finite".to_string(),
        ));
      }
      if grad_norm_sq < 1e-18 {
        break;
      }

      let mut step = 1.0;
      let mut advanced = false;
      for _ in 0..40 {
        let trial: Vec<f64> = x
          .iter()
          .zip(grad.iter())
          .map(|(xi, gi)| xi - step * gi)
          .collect();
        let ft = cost(&trial);
        if ft.is_finite() && ft < fx - 1e-4 * step * grad_norm_sq {
          x = trial;
          let improvement = fx - ft;
          fx = ft;
          advanced = true;
          if improvement < 1e-12 {
            return Ok(x);
          }
          break;
        }
        step *= 0.5;
      }

      if !advanced {
        break;
      }
    }

    Ok(x)
  }
}

pub(crate) fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

/// Project simplex weights onto `[lo, hi]` bounds while keeping the sum at 1.
///
/// Assumes feasible bounds (`lo * n <= 1 <= hi * n`); one redistribution pass
/// restores the sum exactly, the loop only mops up float residue.
pub(crate) fn project_capped_simplex(w: &[f64], lo: f64, hi: f64) -> Vec<f64> {
  let n = w.len();
  if n == 0 {
    return Vec::new();
  }

  let mut out: Vec<f64> = w.iter().map(|&x| x.clamp(lo, hi)).collect();
  for _ in 0..8 {
    let sum: f64 = out.iter().sum();
    let diff = 1.0 - sum;
    if diff.abs() < 1e-12 {
      break;
    }

    if diff > 0.0 {
      let headroom: Vec<f64> = out.iter().map(|&x| hi - x).collect();
      let total: f64 = headroom.iter().sum();
      if total < 1e-15 {
        break;
      }
      let scale = (diff / total).min(1.0);
      for (o, h) in out.iter_mut().zip(headroom.iter()) {
        *o += h * scale;
      }
    } else {
      let slack: Vec<f64> = out.iter().map(|&x| x - lo).collect();
      let total: f64 = slack.iter().sum();
      if total < 1e-15 {
        break;
      }
      let scale = ((-diff) / total).min(1.0);
      for (o, s) in out.iter_mut().zip(slack.iter()) {
        *o -= s * scale;
      }
    }
  }

  out
}

/// Softmax then bound projection: the map every candidate point goes through.
pub(crate) fn map_to_weights(x: &[f64], lo: f64, hi: f64) -> Vec<f64> {
  project_capped_simplex(&softmax(x), lo, hi)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn softmax_is_a_probability_vector() {
    let w = softmax(&[0.5, -1.0, 2.0]);
    let sum: f64 = w.iter().sum();
    assert!((sum - 1.0).abs() < 1e-12);
    assert!(w.iter().all(|&x| x > 0.0));
  }

  #[test]
  fn projection_enforces_bounds_and_sum() {
    let w = vec![0.9, 0.05, 0.05];
    let p = project_capped_simplex(&w, 0.0, 0.5);

    let sum: f64 = p.iter().sum();
    assert!((sum - 1.0).abs() < 1e-9, "sum {sum}");
    assert!(p.iter().all(|&x| x <= 0.5 + 1e-12));
    assert!(p.iter().all(|&x| x >= -1e-12));
  }

  #[test]
  fn projection_respects_lower_bounds() {
    let w = vec![1.0, 0.0, 0.0];
    let p = project_capped_simplex(&w, 0.1, 0.8);

    let sum: f64 = p.iter().sum();
    assert!((sum - 1.0).abs() < 1e-9);
    assert!(p.iter().all(|&x| x >= 0.1 - 1e-12));
    assert!(p.iter().all(|&x| x <= 0.8 + 1e-12));
  }

  #[test]
  fn gradient_descent_finds_a_quadratic_minimum() {
    let cost = |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] + 2.0).powi(2);
    let best = GradientDescentSolver.solve(2, &cost, 500).unwrap();

    assert!((best[0] - 1.0).abs() < 1e-3, "x0 {}", best[0]);
    assert!((best[1] + 2.0).abs() < 1e-3, "x1 {}", best[1]);
  }

  #[cfg(feature = "nelder-mead")]
  #[test]
  fn nelder_mead_finds_a_quadratic_minimum() {
    let cost = |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] + 2.0).powi(2);
    let best = NelderMeadSolver.solve(2, &cost, 5000).unwrap();

    assert!((best[0] - 1.0).abs() < 1e-3, "x0 {}", best[0]);
    assert!((best[1] + 2.0).abs() < 1e-3, "x1 {}", best[1]);
  }

  #[test]
  fn solver_factory_honors_explicit_choices() {
    assert_eq!(
      make_solver(SolverChoice::GradientDescent).unwrap().name(),
      "gradient-descent"
    );
    #[cfg(feature = "nelder-mead")]
    assert_eq!(
      make_solver(SolverChoice::NelderMead).unwrap().name(),
      "nelder-mead"
    );
    #[cfg(not(feature = "nelder-mead"))]
    assert!(make_solver(SolverChoice::NelderMead).is_err());
  }

  #[test]
  fn choice_parsing_falls_back_to_auto() {
    assert_eq!(SolverChoice::from_str("nm"), SolverChoice::NelderMead);
    assert_eq!(
      SolverChoice::from_str("gradient-descent"),
      SolverChoice::GradientDescent
    );
    assert_eq!(SolverChoice::from_str("whatever"), SolverChoice::Auto);
  }
}
