//! # Backtest
//!
//! $$
//! r^{p}_t = \mathbf{w}_k^\top r_t,\qquad t \in [\tau_k, \tau_{k+1}),\quad
//! \mathbf{w}_k = \operatorname{Optimize}\big(\hat\mu, \hat\Sigma \mid [\tau_k - L, \tau_k)\big)
//! $$
//!
//! Rolling rebalance backtest: weights are re-estimated from a trailing lookback window at the
//! start of every rebalance period and held static until the next one.

use chrono::NaiveDate;
use tracing::debug;
use tracing::warn;

use crate::data::shift_months;
use crate::data::shift_years;
use crate::data::ReturnSeries;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::portfolio::PortfolioOptimizer;

/// What to do when a rebalance period cannot be estimated or optimized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
  /// Stop the run and keep the periods already simulated.
  #[default]
  Truncate,
  /// Leave the failing period out and continue with the next one.
  SkipPeriod,
}

/// Runtime configuration for [`Backtester`].
#[derive(Clone, Debug)]
pub struct BacktestConfig {
  /// Length of a rebalance period in calendar months.
  pub rebalance_months: u32,
  /// Length of the trailing estimation window in years.
  pub lookback_years: u32,
  pub failure_policy: FailurePolicy,
}

impl Default for BacktestConfig {
  fn default() -> Self {
    Self {
      rebalance_months: 6,
      lookback_years: 5,
      failure_policy: FailurePolicy::Truncate,
    }
  }
}

/// Weights applied over one rebalance period.
#[derive(Clone, Debug)]
pub struct Rebalance {
  /// First date of the period.
  pub start: NaiveDate,
  /// Last date of the period (inclusive).
  pub end: NaiveDate,
  pub weights: Vec<f64>,
}

/// A period that could not be estimated or optimized.
#[derive(Debug)]
pub struct PeriodFailure {
  pub period_start: NaiveDate,
  pub error: PortfolioError,
}

/// Stitched return series of a backtest plus diagnostics.
#[derive(Debug, Default)]
pub struct BacktestOutcome {
  /// Daily portfolio returns in date order, within `[start_date, end_date]`.
  pub returns: ReturnSeries,
  /// One entry per period that contributed returns.
  pub rebalances: Vec<Rebalance>,
  /// Periods that failed, in order.
  pub failures: Vec<PeriodFailure>,
  /// Whether a failure stopped the run before `end_date`.
  pub truncated: bool,
}

impl BacktestOutcome {
  /// True when every attempted period produced weights.
  pub fn is_complete(&self) -> bool {
    self.failures.is_empty()
  }

  pub fn into_returns(self) -> ReturnSeries {
    self.returns
  }
}

/// Drives a [`PortfolioOptimizer`] across successive rebalance periods.
#[derive(Clone, Debug)]
pub struct Backtester<'a> {
  optimizer: &'a PortfolioOptimizer,
  assets: Vec<String>,
  columns: Vec<usize>,
  config: BacktestConfig,
}

impl<'a> Backtester<'a> {
  /// Backtester with six-month rebalancing and a five-year lookback.
  pub fn new(optimizer: &'a PortfolioOptimizer, assets: Vec<String>) -> Result<Self> {
    Self::with_config(optimizer, assets, BacktestConfig::default())
  }

  /// Fails on an empty asset list or an asset that is not a column of the return table.
  pub fn with_config(
    optimizer: &'a PortfolioOptimizer,
    assets: Vec<String>,
    config: BacktestConfig,
  ) -> Result<Self> {
    if assets.is_empty() {
      return Err(PortfolioError::NoAssets);
    }
    let columns = optimizer.returns().asset_indices(&assets)?;
    Ok(Self {
      optimizer,
      assets,
      columns,
      config,
    })
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn config(&self) -> &BacktestConfig {
    &self.config
  }

  pub fn optimizer(&self) -> &'a PortfolioOptimizer {
    self.optimizer
  }

  /// Estimate on `[start - lookback, start - 1 day]`, then pick weights.
  ///
  /// The estimate is computed even for equal weights, so both strategies stop on the same
  /// windows.
  fn period_weights(
    &self,
    period_start: NaiveDate,
    allow_short: bool,
    equal_weight: bool,
  ) -> Result<Vec<f64>> {
    let est_end = period_start.pred_opt().unwrap_or(period_start);
    let est_start = shift_years(est_end, -(self.config.lookback_years as i32));
    let estimate = self
      .optimizer
      .estimate_parameters(est_start, est_end, &self.assets)?;

    if equal_weight {
      Ok(self.optimizer.equal_weight_portfolio(&self.assets))
    } else {
      self
        .optimizer
        .optimize_portfolio(&estimate.mu, &estimate.sigma, allow_short)
    }
  }

  /// Simulate `[start_date, end_date]` with periodic re-optimization.
  ///
  /// Periods are `[t_k, t_k + rebalance_months)`; the last one is cut at `end_date` and includes
  /// it. A period with no trading days ends the run. `start_date >= end_date` gives an empty
  /// outcome.
  pub fn run_backtest(
    &self,
    start_date: NaiveDate,
    end_date: NaiveDate,
    allow_short: bool,
    equal_weight: bool,
  ) -> BacktestOutcome {
    let returns = self.optimizer.returns();
    let mut outcome = BacktestOutcome::default();
    let mut current = start_date;

    while current < end_date {
      let next = shift_months(current, self.config.rebalance_months as i32).min(end_date);
      let period_end = if next >= end_date {
        end_date
      } else {
        next.pred_opt().unwrap_or(next)
      };

      let rows = returns.rows_between(current, period_end);
      if rows.is_empty() {
        debug!(%current, %period_end, "no trading days in period, stopping");
        break;
      }

      match self.period_weights(current, allow_short, equal_weight) {
        Ok(weights) => {
          debug!(%current, %period_end, days = rows.len(), ?weights, "rebalanced");
          outcome
            .returns
            .append(returns.portfolio_returns(rows, &self.columns, &weights));
          outcome.rebalances.push(Rebalance {
            start: current,
            end: period_end,
            weights,
          });
        }
        Err(error) => {
          let truncate = self.config.failure_policy == FailurePolicy::Truncate;
          warn!(
            %current,
            %error,
            truncate,
            "rebalance failed"
          );
          outcome.failures.push(PeriodFailure {
            period_start: current,
            error,
          });
          if truncate {
            outcome.truncated = true;
            break;
          }
        }
      }

      current = next;
    }

    outcome.returns = std::mem::take(&mut outcome.returns).clip(start_date, end_date);
    outcome
  }
}
