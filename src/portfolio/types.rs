//! # Portfolio Types
//!
//! $$
//! \mu = 252\,\bar r,\qquad \Sigma = 252\,\widehat{\operatorname{Cov}}(r)
//! $$
//!
//! Estimation outputs, optimizer configuration and result containers.

use impl_new_derive::ImplNew;
use nalgebra::DMatrix;
use nalgebra::DVector;

/// Annualized moments estimated over one window.
#[derive(ImplNew, Clone, Debug)]
pub struct ParameterEstimate {
  /// Asset order shared by `mu` and both axes of `sigma`.
  pub assets: Vec<String>,
  /// Annualized arithmetic mean return per asset.
  pub mu: DVector<f64>,
  /// Annualized sample covariance (symmetric).
  pub sigma: DMatrix<f64>,
}

/// Numerical settings for [`super::PortfolioOptimizer`].
#[derive(Clone, Debug)]
pub struct OptimizerConfig {
  /// Periods per year used to annualize daily moments.
  pub trading_days: f64,
  /// Iteration cap of the long-only Nelder-Mead search.
  pub max_iters: u64,
  /// Simplex cost standard deviation at which the search is converged.
  pub sd_tolerance: f64,
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    Self {
      trading_days: 252.0,
      max_iters: 10_000,
      sd_tolerance: 1e-10,
    }
  }
}

/// Model statistics of a weight vector.
#[derive(Clone, Debug, Default)]
pub struct PortfolioResult {
  /// Portfolio weights.
  pub weights: Vec<f64>,
  /// Model expected portfolio return (annualized if inputs are annualized).
  pub expected_return: f64,
  /// Model portfolio volatility.
  pub volatility: f64,
  /// Sharpe ratio computed as `(expected_return - risk_free) / volatility`.
  pub sharpe: f64,
}
