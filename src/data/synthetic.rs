//! # Synthetic Prices
//!
//! $$
//! P_{t+1} = P_t \exp\big((\mu - \tfrac12\sigma^2)\Delta t + \sigma\sqrt{\Delta t}\,Z_t\big)
//! $$
//!
//! Seeded geometric Brownian price paths on a daily calendar, used as a reproducible price source.

use chrono::Days;
use chrono::NaiveDate;
use impl_new_derive::ImplNew;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Distribution;
use rand_distr::StandardNormal;

use super::table::PriceTable;
use crate::error::Result;

/// Independent GBM price paths, one per asset, observed every calendar day.
#[derive(ImplNew, Clone, Debug)]
pub struct SyntheticMarket {
  /// `(name, annual drift, annual volatility)` per asset.
  pub assets: Vec<(String, f64, f64)>,
  /// First date of the index.
  pub start: NaiveDate,
  /// Number of dates.
  pub n_days: usize,
  pub seed: u64,
}

impl SyntheticMarket {
  /// Generate the price table. Every path starts at 100.
  pub fn prices(&self) -> Result<PriceTable> {
    let dt = 1.0 / 252.0_f64;
    let n_assets = self.assets.len();
    let mut rng = StdRng::seed_from_u64(self.seed);
    let mut prices = Array2::<f64>::zeros((self.n_days, n_assets));

    for (j, (_, mu, sigma)) in self.assets.iter().enumerate() {
      let drift = (mu - 0.5 * sigma * sigma) * dt;
      let diffusion = sigma * dt.sqrt();
      let mut p = 100.0;
      for t in 0..self.n_days {
        if t > 0 {
          let z: f64 = StandardNormal.sample(&mut rng);
          p *= (drift + diffusion * z).exp();
        }
        prices[[t, j]] = p;
      }
    }

    let dates = (0..self.n_days as u64)
      .map(|i| self.start + Days::new(i))
      .collect();
    let names = self.assets.iter().map(|(a, _, _)| a.clone()).collect();

    PriceTable::new(dates, names, prices)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn market(seed: u64) -> SyntheticMarket {
    SyntheticMarket::new(
      vec![("AAA".into(), 0.08, 0.2), ("BBB".into(), 0.03, 0.05)],
      NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
      30,
      seed,
    )
  }

  #[test]
  fn same_seed_gives_same_paths() {
    let a = market(7).prices().unwrap();
    let b = market(7).prices().unwrap();
    let c = market(8).prices().unwrap();

    assert_eq!(a.prices(), b.prices());
    assert_ne!(a.prices(), c.prices());
    assert_eq!(a.len(), 30);
    assert_eq!(a.prices()[[0, 1]], 100.0);
    assert!(a.prices().iter().all(|p| *p > 0.0));
  }
}
