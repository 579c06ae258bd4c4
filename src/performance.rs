//! # Performance
//!
//! $$
//! R_{\text{ann}} = \Big(\prod_{t=1}^{n}(1+r_t)\Big)^{252/n} - 1,\qquad
//! \sigma_{\text{ann}} = \sqrt{252}\,\hat\sigma(r)
//! $$
//!
//! Annualized return, volatility, Sharpe ratio and maximum drawdown of a daily return series.

use statrs::statistics::Statistics;

use crate::error::PortfolioError;
use crate::error::Result;

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;

/// Metric record of one return series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerformanceSummary {
  pub annualized_return: f64,
  pub annualized_volatility: f64,
  pub sharpe_ratio: f64,
  pub max_drawdown: f64,
}

/// Summary statistics over a daily return series with missing values removed.
#[derive(Clone, Debug)]
pub struct PerformanceEvaluator {
  returns: Vec<f64>,
  risk_free_rate: f64,
  trading_days: f64,
}

impl PerformanceEvaluator {
  /// Evaluator with a zero risk-free rate and 252 trading days.
  pub fn new(returns: &[f64]) -> Self {
    Self {
      returns: returns.iter().copied().filter(|r| !r.is_nan()).collect(),
      risk_free_rate: 0.0,
      trading_days: TRADING_DAYS,
    }
  }

  pub fn with_risk_free_rate(mut self, risk_free_rate: f64) -> Self {
    self.risk_free_rate = risk_free_rate;
    self
  }

  pub fn with_trading_days(mut self, trading_days: f64) -> Self {
    self.trading_days = trading_days;
    self
  }

  /// Number of usable days.
  pub fn n_days(&self) -> usize {
    self.returns.len()
  }

  fn ensure_non_empty(&self) -> Result<()> {
    if self.returns.is_empty() {
      return Err(PortfolioError::DegenerateSeries(
        "cannot annualize a series with zero days".into(),
      ));
    }
    Ok(())
  }

  /// Geometric annualized return. Errors on an empty series.
  pub fn annualized_return(&self) -> Result<f64> {
    self.ensure_non_empty()?;
    let growth: f64 = self.returns.iter().map(|r| 1.0 + r).product();
    Ok(growth.powf(self.trading_days / self.n_days() as f64) - 1.0)
  }

  /// Sample standard deviation scaled by `sqrt(trading_days)`.
  ///
  /// `NaN` with fewer than two days; exactly `0` when every return is identical.
  pub fn annualized_volatility(&self) -> f64 {
    if self.returns.len() < 2 {
      return f64::NAN;
    }
    let first = self.returns[0];
    if self.returns.iter().all(|&r| r == first) {
      return 0.0;
    }
    self.returns.iter().std_dev() * self.trading_days.sqrt()
  }

  /// Excess annualized return per unit of annualized volatility; `NaN` at zero volatility.
  pub fn sharpe_ratio(&self) -> Result<f64> {
    let ann_return = self.annualized_return()?;
    let ann_vol = self.annualized_volatility();
    if ann_vol == 0.0 {
      return Ok(f64::NAN);
    }
    Ok((ann_return - self.risk_free_rate) / ann_vol)
  }

  /// Most negative relative distance of the compounded NAV from its running peak.
  ///
  /// Never positive; `0` for an empty or non-decreasing NAV.
  pub fn max_drawdown(&self) -> f64 {
    let mut nav = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for r in &self.returns {
      nav *= 1.0 + r;
      peak = peak.max(nav);
      worst = worst.min((nav - peak) / peak);
    }

    worst
  }

  /// All four metrics. Errors on an empty series.
  pub fn summary(&self) -> Result<PerformanceSummary> {
    Ok(PerformanceSummary {
      annualized_return: self.annualized_return()?,
      annualized_volatility: self.annualized_volatility(),
      sharpe_ratio: self.sharpe_ratio()?,
      max_drawdown: self.max_drawdown(),
    })
  }
}
