//! # portfolio-mc
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\ge 0,\ \mathbf{1}^\top\mathbf{w}=1}
//! \frac{\mathbf{w}^\top\mu}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! $$
//!
//! Max-Sharpe portfolio optimization, rolling rebalance backtests and a Monte Carlo comparison of
//! optimal, equal-weight and historical strategies over randomly drawn start dates.
//!
//! Data flows from a [`data::PriceTable`] into a [`portfolio::PortfolioOptimizer`], which a
//! [`backtest::Backtester`] drives period by period. The [`simulation::Simulator`] samples start
//! dates, runs each strategy and hands [`simulation::TrialRecord`]s to a [`report::SummaryTable`].

pub mod backtest;
pub mod data;
pub mod error;
pub mod performance;
pub mod portfolio;
pub mod report;
pub mod simulation;

pub use error::PortfolioError;
pub use error::Result;
