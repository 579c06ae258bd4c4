use std::fmt;

use chrono::NaiveDate;

use crate::performance::PerformanceSummary;

/// Strategy evaluated by a trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mode {
  /// Long-only max-Sharpe weights re-optimized every rebalance period.
  Optimal,
  /// `1/n` weights reset every rebalance period.
  Equal,
  /// Equal-weight average of realized returns over the years preceding the start date.
  Historical,
}

impl Mode {
  pub const ALL: [Mode; 3] = [Mode::Optimal, Mode::Equal, Mode::Historical];

  pub fn as_str(&self) -> &'static str {
    match self {
      Mode::Optimal => "optimal",
      Mode::Equal => "equal",
      Mode::Historical => "historical",
    }
  }
}

impl fmt::Display for Mode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Metrics of one evaluated start date.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrialOutcome {
  pub start_date: NaiveDate,
  pub summary: PerformanceSummary,
}

/// One row of the simulation summary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrialRecord {
  pub summary: PerformanceSummary,
  pub mode: Mode,
  /// Holding horizon in years.
  pub years: u32,
  /// 1-based position among the trials of `(mode, years)` that produced a result.
  pub trial: usize,
  pub start_date: NaiveDate,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn modes_render_lowercase() {
    let names: Vec<String> = Mode::ALL.iter().map(|m| m.to_string()).collect();
    assert_eq!(names, ["optimal", "equal", "historical"]);
  }
}
