//! # Error
//!
//! Shared error taxonomy and the inline metric-error container used by the
//! report types.

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced at the public boundaries of the engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
  /// Insufficient, empty or misaligned history.
  #[error("insufficient data: {0}")]
  Data(String),
  /// Singular matrices, non-convergence or non-finite intermediates.
  #[error("numerical failure: {0}")]
  Numerical(String),
  /// Infeasible or invalid configuration supplied by the caller.
  #[error("invalid configuration: {0}")]
  Configuration(String),
  /// An optional accelerated backend is not compiled in.
  #[error("backend unavailable: {0}")]
  DependencyUnavailable(String),
}

/// A report section that is either a computed metric or an inline error note.
///
/// Public report operations never abort on a partial failure; a section whose
/// preconditions are unmet serializes as `{"error": "..."}` instead.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MetricBlock<T> {
  Metric(T),
  Unavailable { error: String },
}

impl<T> MetricBlock<T> {
  /// Wrap a fallible computation, demoting the error to an inline note.
  pub fn from_result(result: Result<T, EngineError>) -> Self {
    match result {
      Ok(metric) => Self::Metric(metric),
      Err(e) => Self::Unavailable {
        error: e.to_string(),
      },
    }
  }

  /// Inline error with a verbatim message.
  pub fn unavailable(message: impl Into<String>) -> Self {
    Self::Unavailable {
      error: message.into(),
    }
  }

  /// Borrow the metric when the section computed successfully.
  pub fn metric(&self) -> Option<&T> {
    match self {
      Self::Metric(metric) => Some(metric),
      Self::Unavailable { .. } => None,
    }
  }

  /// Borrow the inline error note, if any.
  pub fn error(&self) -> Option<&str> {
    match self {
      Self::Metric(_) => None,
      Self::Unavailable { error } => Some(error),
    }
  }

  pub fn is_available(&self) -> bool {
    matches!(self, Self::Metric(_))
  }
}
