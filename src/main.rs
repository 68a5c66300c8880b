use std::collections::BTreeMap;

use anyhow::Context;
use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Distribution;
use rand_distr::Normal;
use riskalloc::covariance::estimate_covariance;
use riskalloc::covariance::CovarianceMethod;
use riskalloc::optimizer::Constraints;
use riskalloc::optimizer::Objective;
use riskalloc::optimizer::PortfolioOptimizer;
use riskalloc::performance::analyze_performance;
use riskalloc::risk::RiskEngineConfig;
use riskalloc::risk::RiskModelEngine;
use riskalloc::risk::RiskModelKind;
use riskalloc::series::PriceMatrix;
use riskalloc::series::PriceSeries;
use riskalloc::series::ReturnKind;
use riskalloc::series::ReturnSeriesBuilder;

/// Two years of simulated daily closes.
const N_DAYS: usize = 504;

fn main() -> anyhow::Result<()> {
  let start = NaiveDate::from_ymd_opt(2024, 1, 2).context("valid start date")?;
  let mut rng = StdRng::seed_from_u64(7);

  let mut prices = PriceMatrix::new();
  let mut spot = BTreeMap::new();
  for (symbol, drift, vol, open) in [
    ("AAPL", 0.0006, 0.012, 182.0),
    ("GOOGL", 0.0005, 0.014, 139.0),
    ("MSFT", 0.0007, 0.011, 376.0),
    ("NVDA", 0.0012, 0.024, 49.0),
  ] {
    let closes = random_walk(&mut rng, open, drift, vol)?;
    let last = *closes.last().context("walk is non-empty")?;
    spot.insert(symbol.to_string(), last);
    prices.insert(symbol.to_string(), PriceSeries::from_daily_closes(start, closes)?);
  }
  let index = PriceSeries::from_daily_closes(start, random_walk(&mut rng, 4_700.0, 0.0004, 0.009)?)?;

  let builder = ReturnSeriesBuilder::new(ReturnKind::Simple);
  let returns = builder.build_matrix(&prices)?;
  let benchmark = builder.build_series(&index)?;

  let covariance = estimate_covariance(&returns, CovarianceMethod::Shrinkage)?;
  println!("Annualized shrinkage covariance diagonal:");
  for (i, symbol) in covariance.symbols().iter().enumerate() {
    println!("  {symbol}: {:.6}", covariance.get(i, i));
  }

  let constraints = Constraints {
    max_weight: 0.4,
    total_value: Some(25_000.0),
    ..Constraints::default()
  };
  let optimizer = PortfolioOptimizer::default();
  let result = optimizer.optimize_with_prices(&returns, &spot, Objective::MaxSharpe, &constraints)?;
  println!("\nMax-Sharpe portfolio:");
  println!("{}", serde_json::to_string_pretty(&result)?);

  let engine = RiskModelEngine::new(RiskEngineConfig {
    weights: Some(result.weights.clone()),
    ..RiskEngineConfig::default()
  });
  let risk = engine.calculate_risk_metrics(&returns, Some(&benchmark), RiskModelKind::FactorModel)?;
  println!("\nRisk report:");
  println!("{}", serde_json::to_string_pretty(&risk)?);

  let portfolio_returns = returns.weighted_series(&result.weights)?;
  let performance = analyze_performance(&portfolio_returns, Some(&benchmark))?;
  println!("\nPerformance report:");
  println!("{}", serde_json::to_string_pretty(&performance)?);

  let frontier = optimizer.efficient_frontier(&returns, 5, &Constraints::default())?;
  println!("\nEfficient frontier:");
  for point in &frontier {
    println!(
      "  target {:+.4} -> return {:+.4}, volatility {:.4}",
      point.target_return, point.expected_return, point.volatility
    );
  }

  Ok(())
}

fn random_walk(rng: &mut StdRng, open: f64, drift: f64, vol: f64) -> anyhow::Result<Vec<f64>> {
  let normal = Normal::new(drift, vol).context("valid return distribution")?;
  let mut closes = Vec::with_capacity(N_DAYS);
  let mut price = open;

  for _ in 0..N_DAYS {
    price *= 1.0 + normal.sample(rng);
    closes.push(price);
  }

  Ok(closes)
}
