//! # Errors
//!
//! Error taxonomy shared by the data, estimation, backtest and simulation layers.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type of the crate.
#[derive(Error, Debug)]
pub enum PortfolioError {
  #[error("missing price source for {asset}: {}", path.display())]
  MissingSource { asset: String, path: PathBuf },

  #[error("invalid price table: {0}")]
  InvalidTable(String),

  #[error("unknown asset: {0}")]
  UnknownAsset(String),

  #[error("asset list is empty")]
  NoAssets,

  #[error("no return rows between {start} and {end}")]
  EmptyWindow { start: NaiveDate, end: NaiveDate },

  #[error("{found} return rows between {start} and {end}, at least {required} required")]
  InsufficientObservations {
    start: NaiveDate,
    end: NaiveDate,
    found: usize,
    required: usize,
  },

  #[error("covariance matrix is singular")]
  SingularCovariance,

  #[error("optimization failed: {0}")]
  OptimizationFailed(String),

  #[error("only {found} valid start dates, {required} trials requested")]
  InsufficientStartDates { found: usize, required: usize },

  #[error("degenerate return series: {0}")]
  DegenerateSeries(String),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("date parsing error: {0}")]
  DateParse(#[from] chrono::ParseError),
}

impl PortfolioError {
  /// Errors raised while estimating parameters or solving for weights of one rebalance window.
  pub fn is_estimation_failure(&self) -> bool {
    matches!(
      self,
      Self::EmptyWindow { .. }
        | Self::InsufficientObservations { .. }
        | Self::SingularCovariance
        | Self::OptimizationFailed(_)
    )
  }
}

/// Result alias for crate operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;
