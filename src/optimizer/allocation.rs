//! # Discrete Allocation
//!
//! Whole-share conversion of continuous weights under a cash budget. A
//! bounded greedy pass in descending weight order, not an integer program.

use std::collections::BTreeMap;

/// Assign whole shares asset-by-asset while the next share is affordable and
/// moves the dollar holding closer to its target. Ties in weight break on
/// symbol order, so the pass is deterministic.
///
/// Returns share counts for every symbol and the unspent cash; the spend plus
/// leftover always reproduces `total_value`.
pub(crate) fn allocate_discrete(
  symbols: &[String],
  weights: &[f64],
  prices: &BTreeMap<String, f64>,
  total_value: f64,
) -> (BTreeMap<String, u64>, f64) {
  let n = symbols.len();
  let mut order: Vec<usize> = (0..n).collect();
  order.sort_by(|&a, &b| {
    weights[b]
      .partial_cmp(&weights[a])
      .unwrap_or(std::cmp::Ordering::Equal)
      .then_with(|| symbols[a].cmp(&symbols[b]))
  });

  let mut shares = vec![0u64; n];
  let mut spent = 0.0;

  for &i in &order {
    let price = prices[&symbols[i]];
    let target = weights[i] * total_value;

    loop {
      let current = shares[i] as f64 * price;
      let with_next = current + price;
      let improves = (with_next - target).abs() < (current - target).abs();
      if !improves || spent + price > total_value {
        break;
      }
      shares[i] += 1;
      spent += price;
    }
  }

  let allocation: BTreeMap<String, u64> = symbols
    .iter()
    .cloned()
    .zip(shares.iter().copied())
    .collect();

  (allocation, total_value - spent)
}
