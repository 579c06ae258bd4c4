//! # Portfolio Optimizer
//!
//! $$
//! \hat\mu_i = 252\,\frac{1}{T}\sum_t r_{t,i},\qquad
//! \hat\Sigma_{ij} = 252\,\frac{1}{T-1}\sum_t (r_{t,i}-\bar r_i)(r_{t,j}-\bar r_j)
//! $$
//!
//! Owns the return table derived from a price table and estimates moments over date windows.

use chrono::NaiveDate;
use nalgebra::DMatrix;
use nalgebra::DVector;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;

use super::optimizers::equal_weights;
use super::optimizers::max_sharpe_long_only;
use super::optimizers::tangency_weights;
use super::types::OptimizerConfig;
use super::types::ParameterEstimate;
use crate::data::PriceTable;
use crate::data::ReturnsTable;
use crate::error::PortfolioError;
use crate::error::Result;

/// Minimum rows for a sample covariance.
const MIN_OBSERVATIONS: usize = 2;

/// Moment estimation and weight optimization over a fixed return table.
#[derive(Clone, Debug)]
pub struct PortfolioOptimizer {
  returns: ReturnsTable,
  config: OptimizerConfig,
}

impl PortfolioOptimizer {
  /// Build the optimizer from a price table with default settings.
  ///
  /// Returns are computed once here; dates where any asset lacks a price are dropped.
  pub fn new(prices: &PriceTable) -> Self {
    Self::with_config(prices, OptimizerConfig::default())
  }

  pub fn with_config(prices: &PriceTable, config: OptimizerConfig) -> Self {
    Self::from_returns(ReturnsTable::from_prices(prices), config)
  }

  pub fn from_returns(returns: ReturnsTable, config: OptimizerConfig) -> Self {
    Self { returns, config }
  }

  /// Borrow the derived return table.
  pub fn returns(&self) -> &ReturnsTable {
    &self.returns
  }

  pub fn config(&self) -> &OptimizerConfig {
    &self.config
  }

  /// Annualized mean and covariance of `assets` over returns dated within `[start, end]`.
  pub fn estimate_parameters(
    &self,
    start: NaiveDate,
    end: NaiveDate,
    assets: &[String],
  ) -> Result<ParameterEstimate> {
    let cols = self.returns.asset_indices(assets)?;
    let rows = self.returns.rows_between(start, end);

    if rows.is_empty() {
      return Err(PortfolioError::EmptyWindow { start, end });
    }
    if rows.len() < MIN_OBSERVATIONS {
      return Err(PortfolioError::InsufficientObservations {
        start,
        end,
        found: rows.len(),
        required: MIN_OBSERVATIONS,
      });
    }

    let sample = self.returns.select(rows, &cols);
    let n = cols.len();
    let td = self.config.trading_days;

    let mean = sample
      .mean_axis(Axis(0))
      .ok_or(PortfolioError::EmptyWindow { start, end })?;
    let cov = sample
      .t()
      .cov(1.0)
      .map_err(|_| PortfolioError::EmptyWindow { start, end })?;

    let mu = DVector::from_iterator(n, mean.iter().map(|m| m * td));
    // Averaging with the transpose keeps sigma exactly symmetric.
    let sigma = DMatrix::from_fn(n, n, |i, j| 0.5 * (cov[[i, j]] + cov[[j, i]]) * td);

    Ok(ParameterEstimate::new(assets.to_vec(), mu, sigma))
  }

  /// Max-Sharpe weights for `(mu, sigma)`.
  ///
  /// With `allow_short` the closed-form tangency portfolio is returned, otherwise the long-only
  /// constrained search is run.
  pub fn optimize_portfolio(
    &self,
    mu: &DVector<f64>,
    sigma: &DMatrix<f64>,
    allow_short: bool,
  ) -> Result<Vec<f64>> {
    if allow_short {
      tangency_weights(mu, sigma)
    } else {
      max_sharpe_long_only(mu, sigma, &self.config)
    }
  }

  /// `1/n` weight per asset.
  pub fn equal_weight_portfolio(&self, assets: &[String]) -> Vec<f64> {
    equal_weights(assets.len())
  }
}
