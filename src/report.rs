//! # Report
//!
//! $$
//! \bar m_{(\text{mode},\,H)} = \frac{1}{|G|}\sum_{i \in G,\ m_i \neq \text{NaN}} m_i
//! $$
//!
//! Collects trial records across strategies and horizons, averages them per group and exports the
//! per-trial and per-group tables.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::performance::PerformanceSummary;
use crate::simulation::Mode;
use crate::simulation::TrialRecord;

/// File name of the per-trial table.
pub const TRIALS_FILE: &str = "simulation_summary.csv";
/// File name of the per-group means.
pub const GROUPS_FILE: &str = "summary_table.csv";

#[derive(Serialize)]
struct TrialRow<'a> {
  #[serde(rename = "Annualized Return")]
  annualized_return: f64,
  #[serde(rename = "Annualized Volatility")]
  annualized_volatility: f64,
  #[serde(rename = "Sharpe Ratio")]
  sharpe_ratio: f64,
  #[serde(rename = "Max Drawdown")]
  max_drawdown: f64,
  #[serde(rename = "Mode")]
  mode: &'a str,
  #[serde(rename = "Years")]
  years: u32,
  #[serde(rename = "Trial")]
  trial: usize,
  #[serde(rename = "Start Date")]
  start_date: String,
  #[serde(rename = "Label")]
  label: String,
}

#[derive(Serialize)]
struct GroupRow<'a> {
  #[serde(rename = "Mode")]
  mode: &'a str,
  #[serde(rename = "Years")]
  years: u32,
  #[serde(rename = "Annualized Return")]
  annualized_return: f64,
  #[serde(rename = "Annualized Volatility")]
  annualized_volatility: f64,
  #[serde(rename = "Sharpe Ratio")]
  sharpe_ratio: f64,
  #[serde(rename = "Max Drawdown")]
  max_drawdown: f64,
}

/// Metric means of one `(mode, years)` group.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroupSummary {
  pub mode: Mode,
  pub years: u32,
  /// Number of trial records in the group.
  pub trials: usize,
  pub means: PerformanceSummary,
}

/// `"<mode>_<years>Y"`, e.g. `optimal_3Y`.
pub fn label(mode: Mode, years: u32) -> String {
  format!("{mode}_{years}Y")
}

/// Mean of the non-NaN values, `NaN` when there are none.
fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
  let (sum, n) = values
    .filter(|v| !v.is_nan())
    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
  if n == 0 {
    f64::NAN
  } else {
    sum / n as f64
  }
}

fn round4(x: f64) -> f64 {
  (x * 1e4).round() / 1e4
}

/// Trial records gathered over every simulated `(mode, years)` combination.
#[derive(Clone, Debug, Default)]
pub struct SummaryTable {
  records: Vec<TrialRecord>,
}

impl SummaryTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, record: TrialRecord) {
    self.records.push(record);
  }

  pub fn records(&self) -> &[TrialRecord] {
    &self.records
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// Per-group metric means, ordered by mode name then horizon.
  pub fn group_means(&self) -> Vec<GroupSummary> {
    let mut groups: BTreeMap<(&'static str, u32), Vec<&TrialRecord>> = BTreeMap::new();
    for record in &self.records {
      groups
        .entry((record.mode.as_str(), record.years))
        .or_default()
        .push(record);
    }

    groups
      .into_values()
      .map(|group| {
        let mean =
          |f: fn(&PerformanceSummary) -> f64| nan_mean(group.iter().map(|r| f(&r.summary)));
        GroupSummary {
          mode: group[0].mode,
          years: group[0].years,
          trials: group.len(),
          means: PerformanceSummary {
            annualized_return: mean(|s| s.annualized_return),
            annualized_volatility: mean(|s| s.annualized_volatility),
            sharpe_ratio: mean(|s| s.sharpe_ratio),
            max_drawdown: mean(|s| s.max_drawdown),
          },
        }
      })
      .collect()
  }

  /// Write [`TRIALS_FILE`] and [`GROUPS_FILE`] into `dir`, creating it if needed.
  pub fn write_csv(&self, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut trials = csv::Writer::from_path(dir.join(TRIALS_FILE))?;
    for r in &self.records {
      trials.serialize(TrialRow {
        annualized_return: r.summary.annualized_return,
        annualized_volatility: r.summary.annualized_volatility,
        sharpe_ratio: r.summary.sharpe_ratio,
        max_drawdown: r.summary.max_drawdown,
        mode: r.mode.as_str(),
        years: r.years,
        trial: r.trial,
        start_date: r.start_date.to_string(),
        label: label(r.mode, r.years),
      })?;
    }
    trials.flush()?;

    let groups = self.group_means();
    let mut table = csv::Writer::from_path(dir.join(GROUPS_FILE))?;
    for g in &groups {
      table.serialize(GroupRow {
        mode: g.mode.as_str(),
        years: g.years,
        annualized_return: round4(g.means.annualized_return),
        annualized_volatility: round4(g.means.annualized_volatility),
        sharpe_ratio: round4(g.means.sharpe_ratio),
        max_drawdown: round4(g.means.max_drawdown),
      })?;
    }
    table.flush()?;

    info!(
      dir = %dir.display(),
      trials = self.records.len(),
      groups = groups.len(),
      "wrote summary tables"
    );
    Ok(())
  }

  /// Console table of the group means.
  pub fn to_table(&self) -> Table {
    let mut table = Table::new();
    table.set_titles(Row::new(
      [
        "Label",
        "Trials",
        "Ann. Return",
        "Ann. Volatility",
        "Sharpe",
        "Max Drawdown",
      ]
      .into_iter()
      .map(Cell::new)
      .collect(),
    ));

    for g in self.group_means() {
      table.add_row(Row::new(vec![
        Cell::new(&label(g.mode, g.years)),
        Cell::new(&g.trials.to_string()),
        Cell::new(&format!("{:.4}", g.means.annualized_return)),
        Cell::new(&format!("{:.4}", g.means.annualized_volatility)),
        Cell::new(&format!("{:.4}", g.means.sharpe_ratio)),
        Cell::new(&format!("{:.4}", g.means.max_drawdown)),
      ]));
    }

    table
  }

  pub fn print(&self) {
    self.to_table().printstd();
  }
}

impl Extend<TrialRecord> for SummaryTable {
  fn extend<I: IntoIterator<Item = TrialRecord>>(&mut self, iter: I) {
    self.records.extend(iter);
  }
}
