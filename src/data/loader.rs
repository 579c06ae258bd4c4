//! # Price Source
//!
//! Loads one `Date,...,Adj Close,...` CSV per asset and outer-joins them on date.

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use ndarray::Array2;
use serde::Deserialize;
use tracing::debug;
use tracing::info;

use super::table::PriceTable;
use crate::error::PortfolioError;
use crate::error::Result;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct PriceRecord {
  #[serde(rename = "Date")]
  date: String,
  #[serde(rename = "Adj Close")]
  adj_close: String,
}

fn parse_price(raw: &str) -> f64 {
  match raw.trim() {
    "" | "null" | "NaN" | "nan" => f64::NAN,
    s => s.parse().unwrap_or(f64::NAN),
  }
}

fn read_adjusted_closes(path: &Path) -> Result<Vec<(NaiveDate, f64)>> {
  let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
  let mut rows = Vec::new();

  for record in reader.deserialize::<PriceRecord>() {
    let record = record?;
    let date = NaiveDate::parse_from_str(record.date.trim(), DATE_FORMAT)?;
    rows.push((date, parse_price(&record.adj_close)));
  }

  Ok(rows)
}

/// Map each asset to `<dir>/<ASSET>.csv`.
pub fn price_sources(dir: impl AsRef<Path>, assets: &[String]) -> Vec<(String, PathBuf)> {
  assets
    .iter()
    .map(|a| (a.clone(), dir.as_ref().join(format!("{a}.csv"))))
    .collect()
}

/// Load and merge per-asset adjusted closes into one ascending [`PriceTable`].
///
/// The merge is a union over dates; an asset without a quote on a date gets `NaN`.
/// A missing file is an error, never a silently dropped column.
pub fn load_price_table(sources: &[(String, PathBuf)]) -> Result<PriceTable> {
  let n = sources.len();
  let mut merged: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();

  for (col, (asset, path)) in sources.iter().enumerate() {
    if !path.exists() {
      return Err(PortfolioError::MissingSource {
        asset: asset.clone(),
        path: path.clone(),
      });
    }

    let rows = read_adjusted_closes(path)?;
    debug!(asset = %asset, rows = rows.len(), "loaded price file");

    for (date, price) in rows {
      merged.entry(date).or_insert_with(|| vec![f64::NAN; n])[col] = price;
    }
  }

  let dates: Vec<NaiveDate> = merged.keys().copied().collect();
  let flat: Vec<f64> = merged.into_values().flatten().collect();
  let prices = Array2::from_shape_vec((dates.len(), n), flat)
    .map_err(|e| PortfolioError::InvalidTable(e.to_string()))?;
  let assets = sources.iter().map(|(a, _)| a.clone()).collect();

  info!(assets = n, dates = dates.len(), "price table assembled");
  PriceTable::new(dates, assets, prices)
}

#[cfg(test)]
mod tests {
  use std::fs;

  use super::*;

  fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
  }

  #[test]
  fn merges_assets_on_date_union() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_csv(
      dir.path(),
      "AAA.csv",
      "Date,Open,High,Low,Close,Adj Close,Volume\n\
       2020-01-02,1,1,1,1,10.0,100\n\
       2020-01-03,1,1,1,1,11.0,100\n",
    );
    let b = write_csv(
      dir.path(),
      "BBB.csv",
      "Date,Adj Close\n2020-01-01,5.0\n2020-01-03,null\n",
    );

    let table = load_price_table(&[("AAA".into(), a), ("BBB".into(), b)]).unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(table.assets(), &["AAA".to_string(), "BBB".to_string()]);
    assert!(table.prices()[[0, 0]].is_nan());
    assert_eq!(table.prices()[[0, 1]], 5.0);
    assert_eq!(table.prices()[[2, 0]], 11.0);
    assert!(table.prices()[[2, 1]].is_nan());
  }

  #[test]
  fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let sources = price_sources(dir.path(), &["VTSMX".to_string()]);
    let err = load_price_table(&sources);

    assert!(matches!(err, Err(PortfolioError::MissingSource { asset, .. }) if asset == "VTSMX"));
  }
}
