//! # Tables
//!
//! $$
//! R = \{ r_t : r_{t,i} \text{ finite } \forall i \}
//! $$
//!
//! Date-indexed price and return matrices. Rows are dates, columns are assets.

use std::collections::HashSet;
use std::ops::Range;

use chrono::NaiveDate;
use ndarray::s;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;

use crate::error::PortfolioError;
use crate::error::Result;

fn validate_index(dates: &[NaiveDate], assets: &[String], shape: (usize, usize)) -> Result<()> {
  if shape != (dates.len(), assets.len()) {
    return Err(PortfolioError::InvalidTable(format!(
      "matrix shape {:?} does not match {} dates x {} assets",
      shape,
      dates.len(),
      assets.len()
    )));
  }

  if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
    return Err(PortfolioError::InvalidTable(format!(
      "dates must be strictly increasing ({} followed by {})",
      w[0], w[1]
    )));
  }

  let mut seen = HashSet::with_capacity(assets.len());
  for asset in assets {
    if !seen.insert(asset.as_str()) {
      return Err(PortfolioError::InvalidTable(format!(
        "duplicate asset column {asset}"
      )));
    }
  }

  Ok(())
}

/// Adjusted close prices on a shared, ascending date index. Gaps are `NaN`.
#[derive(Clone, Debug)]
pub struct PriceTable {
  dates: Vec<NaiveDate>,
  assets: Vec<String>,
  prices: Array2<f64>,
}

impl PriceTable {
  /// Build a table from a date index, column names and a `(dates, assets)` price matrix.
  pub fn new(dates: Vec<NaiveDate>, assets: Vec<String>, prices: Array2<f64>) -> Result<Self> {
    validate_index(&dates, &assets, prices.dim())?;
    Ok(Self {
      dates,
      assets,
      prices,
    })
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn prices(&self) -> &Array2<f64> {
    &self.prices
  }

  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }
}

/// One-period simple returns, restricted to dates where every asset has a finite return.
///
/// The row filter is an intersection over all columns of the source price table: a gap in a
/// single asset removes that date for every asset. Infinite returns, which follow a zero price,
/// are dropped the same way as missing ones so that moment estimates stay finite.
#[derive(Clone, Debug)]
pub struct ReturnsTable {
  dates: Vec<NaiveDate>,
  assets: Vec<String>,
  returns: Array2<f64>,
}

impl ReturnsTable {
  /// Percentage change without gap filling, then drop every row holding a missing value.
  pub fn from_prices(prices: &PriceTable) -> Self {
    let p = prices.prices();
    let n_assets = prices.assets().len();
    let mut dates = Vec::with_capacity(prices.len().saturating_sub(1));
    let mut flat = Vec::with_capacity(prices.len().saturating_sub(1) * n_assets);

    for t in 1..prices.len() {
      let row: Vec<f64> = (0..n_assets)
        .map(|i| p[[t, i]] / p[[t - 1, i]] - 1.0)
        .collect();
      if row.iter().all(|r| r.is_finite()) {
        dates.push(prices.dates()[t]);
        flat.extend(row);
      }
    }

    let returns = Array2::from_shape_vec((dates.len(), n_assets), flat)
      .unwrap_or_else(|_| Array2::zeros((0, n_assets)));

    Self {
      dates,
      assets: prices.assets().to_vec(),
      returns,
    }
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn values(&self) -> &Array2<f64> {
    &self.returns
  }

  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }

  pub fn first_date(&self) -> Option<NaiveDate> {
    self.dates.first().copied()
  }

  pub fn last_date(&self) -> Option<NaiveDate> {
    self.dates.last().copied()
  }

  /// Column positions of `assets`, in the requested order.
  pub fn asset_indices(&self, assets: &[String]) -> Result<Vec<usize>> {
    assets
      .iter()
      .map(|a| {
        self
          .assets
          .iter()
          .position(|c| c == a)
          .ok_or_else(|| PortfolioError::UnknownAsset(a.clone()))
      })
      .collect()
  }

  /// Row range covering dates in `[start, end]`, both ends inclusive.
  pub fn rows_between(&self, start: NaiveDate, end: NaiveDate) -> Range<usize> {
    let lo = self.dates.partition_point(|d| *d < start);
    let hi = self.dates.partition_point(|d| *d <= end);
    lo..hi.max(lo)
  }

  /// Copy of the sub-matrix for `rows` and the given columns.
  pub fn select(&self, rows: Range<usize>, cols: &[usize]) -> Array2<f64> {
    self.returns.slice(s![rows, ..]).select(Axis(1), cols)
  }

  /// Row-wise dot product of the selected returns with a static weight vector.
  pub fn portfolio_returns(
    &self,
    rows: Range<usize>,
    cols: &[usize],
    weights: &[f64],
  ) -> ReturnSeries {
    let dates = self.dates[rows.clone()].to_vec();
    let w = Array1::from(weights.to_vec());
    let values = self.select(rows, cols).dot(&w).to_vec();
    ReturnSeries::new(dates, values)
  }

  /// Unweighted cross-sectional mean return per row; `NaN` rows when `cols` is empty.
  pub fn cross_sectional_mean(&self, rows: Range<usize>, cols: &[usize]) -> ReturnSeries {
    let dates = self.dates[rows.clone()].to_vec();
    let values = self
      .select(rows, cols)
      .mean_axis(Axis(1))
      .map(|m| m.to_vec())
      .unwrap_or_else(|| vec![f64::NAN; dates.len()]);
    ReturnSeries::new(dates, values)
  }
}

/// Date-indexed daily return series.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReturnSeries {
  dates: Vec<NaiveDate>,
  values: Vec<f64>,
}

impl ReturnSeries {
  pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Self {
    debug_assert_eq!(dates.len(), values.len());
    Self { dates, values }
  }

  pub fn empty() -> Self {
    Self::default()
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn values(&self) -> &[f64] {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Append `other`, which must start after the last date held.
  pub fn append(&mut self, other: ReturnSeries) {
    debug_assert!(match (self.dates.last(), other.dates.first()) {
      (Some(a), Some(b)) => a < b,
      _ => true,
    });
    self.dates.extend(other.dates);
    self.values.extend(other.values);
  }

  /// Keep only observations dated within `[start, end]`.
  pub fn clip(mut self, start: NaiveDate, end: NaiveDate) -> Self {
    let lo = self.dates.partition_point(|d| *d < start);
    let hi = self.dates.partition_point(|d| *d <= end).max(lo);
    self.dates = self.dates[lo..hi].to_vec();
    self.values = self.values[lo..hi].to_vec();
    self
  }
}
