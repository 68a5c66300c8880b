//! # riskalloc
//!
//! `riskalloc` builds constrained portfolios from daily price history and reports
//! the risk and performance characteristics of the result. The pipeline runs
//! price alignment, covariance estimation, weight optimization, risk modeling
//! and performance attribution as independent stages that share one return
//! matrix.
//!
//! ## Modules
//!
//! | Module          | Description                                                                |
//! |-----------------|----------------------------------------------------------------------------|
//! | [`series`]      | Price and return series, inner-join date alignment, return matrix builder. |
//! | [`covariance`]  | Sample, EWMA and Ledoit-Wolf shrinkage covariance estimators.              |
//! | [`optimizer`]   | Constrained weight optimization and discrete share allocation.             |
//! | [`risk`]        | Volatility, value at risk, drawdowns, benchmark relation, factor analysis. |
//! | [`performance`] | Return, efficiency, risk-adjusted, tail and benchmark comparison metrics.  |
//! | [`stats`]       | Shared sample statistics and normality diagnostics.                        |
//! | [`error`]       | Error taxonomy and inline metric blocks for partial failures.              |
//!
//! ## Example Usage
//!
//! ```rust
//! use riskalloc::optimizer::Constraints;
//! use riskalloc::optimizer::Objective;
//! use riskalloc::optimizer::PortfolioOptimizer;
//! use riskalloc::series::ReturnKind;
//! use riskalloc::series::ReturnSeriesBuilder;
//!
//! let returns = ReturnSeriesBuilder::new(ReturnKind::Simple).build_matrix(&prices)?;
//! let optimizer = PortfolioOptimizer::default();
//! let result = optimizer.optimize(&returns, Objective::MaxSharpe, &Constraints::default())?;
//! ```

pub mod covariance;
pub mod error;
pub mod optimizer;
pub mod performance;
pub mod risk;
pub mod series;
pub mod stats;

/// Trading days per year used for annualization throughout the crate.
pub const TRADING_DAYS_PER_YEAR: usize = 252;
