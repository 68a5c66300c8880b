//! # Return Series
//!
//! $$
//! r_t = \frac{P_t}{P_{t-1}} - 1
//! $$
//!
//! Price-to-return conversion with inner-join date alignment across assets.

use std::collections::BTreeMap;

use chrono::Days;
use chrono::NaiveDate;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use serde::Deserialize;
use serde::Serialize;

use crate::error::EngineError;

/// Symbol -> price history. BTreeMap keeps column order deterministic.
pub type PriceMatrix = BTreeMap<String, PriceSeries>;

/// Closing-price history for one asset, strictly increasing dates.
#[derive(Debug, Clone)]
pub struct PriceSeries {
  dates: Vec<NaiveDate>,
  closes: Vec<f64>,
}

impl PriceSeries {
  pub fn new(dates: Vec<NaiveDate>, closes: Vec<f64>) -> Result<Self, EngineError> {
    if dates.is_empty() {
      return Err(EngineError::Data("empty price series".to_string()));
    }
    if dates.len() != closes.len() {
      return Err(EngineError::Data(format!(
        "price series has {} dates but {} closes",
        dates.len(),
        closes.len()
      )));
    }
    if dates.windows(2).any(|w| w[0] >= w[1]) {
      return Err(EngineError::Data(
        "price series dates must be strictly increasing".to_string(),
      ));
    }
    if closes.iter().any(|c| !c.is_finite() || *c <= 0.0) {
      return Err(EngineError::Data(
        "price series closes must be finite and positive".to_string(),
      ));
    }

    Ok(Self { dates, closes })
  }

  /// Convenience constructor assigning consecutive calendar days from `start`.
  pub fn from_daily_closes(start: NaiveDate, closes: Vec<f64>) -> Result<Self, EngineError> {
    let mut dates = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
      let date = start
        .checked_add_days(Days::new(i as u64))
        .ok_or_else(|| EngineError::Data("price series date out of range".to_string()))?;
      dates.push(date);
    }
    Self::new(dates, closes)
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn closes(&self) -> &[f64] {
    &self.closes
  }

  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }
}

/// Return convention applied when converting prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
  #[default]
  Simple,
  Log,
}

impl ReturnKind {
  pub fn from_str(kind: &str) -> Self {
    match kind.to_lowercase().as_str() {
      "log" => Self::Log,
      _ => Self::Simple,
    }
  }

  fn apply(&self, prev: f64, next: f64) -> f64 {
    match self {
      Self::Simple => next / prev - 1.0,
      Self::Log => (next / prev).ln(),
    }
  }
}

/// Aligned return observations, rows = dates, columns = assets.
#[derive(Debug, Clone)]
pub struct ReturnMatrix {
  symbols: Vec<String>,
  dates: Vec<NaiveDate>,
  values: Array2<f64>,
}

impl ReturnMatrix {
  /// Build directly from precomputed returns, e.g. when a caller already
  /// holds aligned return data instead of prices.
  pub fn new(
    symbols: Vec<String>,
    dates: Vec<NaiveDate>,
    values: Array2<f64>,
  ) -> Result<Self, EngineError> {
    if symbols.is_empty() {
      return Err(EngineError::Data("no symbols supplied".to_string()));
    }
    if symbols.len() != values.ncols() {
      return Err(EngineError::Data(format!(
        "{} symbols for {} return columns",
        symbols.len(),
        values.ncols()
      )));
    }
    if dates.len() != values.nrows() {
      return Err(EngineError::Data(format!(
        "{} dates for {} return rows",
        dates.len(),
        values.nrows()
      )));
    }
    if dates.windows(2).any(|w| w[0] >= w[1]) {
      return Err(EngineError::Data(
        "return matrix dates must be strictly increasing".to_string(),
      ));
    }
    if values.iter().any(|v| !v.is_finite()) {
      return Err(EngineError::Data(
        "return matrix values must be finite".to_string(),
      ));
    }

    Ok(Self {
      symbols,
      dates,
      values,
    })
  }

  pub fn symbols(&self) -> &[String] {
    &self.symbols
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn values(&self) -> &Array2<f64> {
    &self.values
  }

  pub fn n_assets(&self) -> usize {
    self.symbols.len()
  }

  pub fn n_observations(&self) -> usize {
    self.values.nrows()
  }

  pub fn is_empty(&self) -> bool {
    self.values.nrows() == 0 || self.symbols.is_empty()
  }

  pub fn column(&self, idx: usize) -> ArrayView1<'_, f64> {
    self.values.column(idx)
  }

  /// Return stream of a single asset, if present.
  pub fn column_series(&self, symbol: &str) -> Option<ReturnSeries> {
    let idx = self.symbols.iter().position(|s| s == symbol)?;
    Some(ReturnSeries {
      dates: self.dates.clone(),
      values: self.values.column(idx).to_owned(),
    })
  }

  /// Portfolio return stream under fixed weights.
  pub fn weighted_series(&self, weights: &[f64]) -> Result<ReturnSeries, EngineError> {
    if weights.len() != self.n_assets() {
      return Err(EngineError::Configuration(format!(
        "{} weights supplied for {} assets",
        weights.len(),
        self.n_assets()
      )));
    }

    let w = Array1::from_vec(weights.to_vec());
    Ok(ReturnSeries {
      dates: self.dates.clone(),
      values: self.values.dot(&w),
    })
  }
}

/// Single return stream (asset, portfolio or benchmark).
#[derive(Debug, Clone)]
pub struct ReturnSeries {
  dates: Vec<NaiveDate>,
  values: Array1<f64>,
}

impl ReturnSeries {
  pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, EngineError> {
    if dates.len() != values.len() {
      return Err(EngineError::Data(format!(
        "return series has {} dates but {} values",
        dates.len(),
        values.len()
      )));
    }
    if dates.windows(2).any(|w| w[0] >= w[1]) {
      return Err(EngineError::Data(
        "return series dates must be strictly increasing".to_string(),
      ));
    }
    if values.iter().any(|v| !v.is_finite()) {
      return Err(EngineError::Data(
        "return series values must be finite".to_string(),
      ));
    }

    Ok(Self {
      dates,
      values: Array1::from_vec(values),
    })
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn values(&self) -> &Array1<f64> {
    &self.values
  }

  pub fn as_slice(&self) -> &[f64] {
    self.values.as_slice().unwrap_or(&[])
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Date-intersected observation pairs of `self` and `other`.
  pub fn align_with(&self, other: &ReturnSeries) -> (Array1<f64>, Array1<f64>) {
    let mut a = Vec::new();
    let mut b = Vec::new();

    let mut i = 0;
    let mut j = 0;
    while i < self.dates.len() && j < other.dates.len() {
      match self.dates[i].cmp(&other.dates[j]) {
        std::cmp::Ordering::Less => i += 1,
        std::cmp::Ordering::Greater => j += 1,
        std::cmp::Ordering::Equal => {
          a.push(self.values[i]);
          b.push(other.values[j]);
          i += 1;
          j += 1;
        }
      }
    }

    (Array1::from_vec(a), Array1::from_vec(b))
  }
}

/// Converts price histories into aligned return matrices and series.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReturnSeriesBuilder {
  kind: ReturnKind,
}

impl ReturnSeriesBuilder {
  pub fn new(kind: ReturnKind) -> Self {
    Self { kind }
  }

  pub fn kind(&self) -> ReturnKind {
    self.kind
  }

  /// Single-asset return stream over consecutive observations.
  pub fn build_series(&self, prices: &PriceSeries) -> Result<ReturnSeries, EngineError> {
    if prices.len() < 2 {
      return Err(EngineError::Data(format!(
        "at least 2 price observations required, got {}",
        prices.len()
      )));
    }

    let closes = prices.closes();
    let mut values = Vec::with_capacity(closes.len() - 1);
    for i in 1..closes.len() {
      values.push(self.kind.apply(closes[i - 1], closes[i]));
    }

    Ok(ReturnSeries {
      dates: prices.dates()[1..].to_vec(),
      values: Array1::from_vec(values),
    })
  }

  /// Multi-asset return matrix over the inner join of all symbols' dates.
  ///
  /// Rows with a missing close for any asset are dropped, never imputed, so
  /// the output carries one return per consecutive pair of aligned dates.
  pub fn build_matrix(&self, prices: &PriceMatrix) -> Result<ReturnMatrix, EngineError> {
    if prices.is_empty() {
      return Err(EngineError::Data("no price series supplied".to_string()));
    }

    let n_symbols = prices.len();
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for series in prices.values() {
      for date in series.dates() {
        *counts.entry(*date).or_insert(0) += 1;
      }
    }

    let aligned: Vec<NaiveDate> = counts
      .into_iter()
      .filter(|(_, c)| *c == n_symbols)
      .map(|(d, _)| d)
      .collect();

    if aligned.len() < 2 {
      return Err(EngineError::Data(format!(
        "fewer than 2 dates aligned across all {n_symbols} assets"
      )));
    }

    let symbols: Vec<String> = prices.keys().cloned().collect();
    let n_rows = aligned.len() - 1;
    let mut values = Array2::zeros((n_rows, n_symbols));

    for (col, series) in prices.values().enumerate() {
      let lookup: BTreeMap<&NaiveDate, f64> = series
        .dates()
        .iter()
        .zip(series.closes().iter().copied())
        .collect();

      for row in 0..n_rows {
        let prev = lookup[&aligned[row]];
        let next = lookup[&aligned[row + 1]];
        values[(row, col)] = self.kind.apply(prev, next);
      }
    }

    Ok(ReturnMatrix {
      symbols,
      dates: aligned[1..].to_vec(),
      values,
    })
  }
}
