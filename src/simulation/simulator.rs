use std::collections::HashMap;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use rayon::iter::IntoParallelRefIterator;
use rayon::iter::ParallelIterator;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::config::SimulationConfig;
use super::trial::Mode;
use super::trial::TrialOutcome;
use super::trial::TrialRecord;
use crate::backtest::Backtester;
use crate::data::shift_years;
use crate::error::PortfolioError;
use crate::error::Result;
use crate::performance::PerformanceEvaluator;
use crate::performance::PerformanceSummary;
use crate::portfolio::PortfolioOptimizer;

/// Runs repeated trials of a strategy from randomly sampled start dates.
///
/// Start dates are drawn once per `(holding_years, lookback_years)` and reused by every mode,
/// so strategies are compared on identical windows.
#[derive(Debug)]
pub struct Simulator<'a> {
  optimizer: &'a PortfolioOptimizer,
  backtester: &'a Backtester<'a>,
  assets: Vec<String>,
  columns: Vec<usize>,
  config: SimulationConfig,
  rng: StdRng,
  start_dates: HashMap<(u32, u32), Vec<NaiveDate>>,
}

impl<'a> Simulator<'a> {
  /// Fails on an empty asset list or an asset that is not a column of the return table.
  pub fn new(
    optimizer: &'a PortfolioOptimizer,
    backtester: &'a Backtester<'a>,
    assets: Vec<String>,
    config: SimulationConfig,
  ) -> Result<Self> {
    if assets.is_empty() {
      return Err(PortfolioError::NoAssets);
    }
    let columns = optimizer.returns().asset_indices(&assets)?;
    Ok(Self {
      optimizer,
      backtester,
      assets,
      columns,
      rng: StdRng::seed_from_u64(config.seed),
      config,
      start_dates: HashMap::new(),
    })
  }

  pub fn assets(&self) -> &[String] {
    &self.assets
  }

  pub fn config(&self) -> &SimulationConfig {
    &self.config
  }

  /// Every return date `d` with `first + lookback <= d <= last - holding`.
  pub fn candidate_start_dates(&self, holding_years: u32, lookback_years: u32) -> Vec<NaiveDate> {
    let returns = self.optimizer.returns();
    let (Some(first), Some(last)) = (returns.first_date(), returns.last_date()) else {
      return Vec::new();
    };
    let lower = shift_years(first, lookback_years as i32);
    let upper = shift_years(last, -(holding_years as i32));

    returns.dates()[returns.rows_between(lower, upper)].to_vec()
  }

  /// Sorted sample of `n_trials` distinct candidate dates, cached per horizon.
  ///
  /// The first call for a horizon draws from the seeded generator; later calls return the same
  /// dates until [`Simulator::reset_start_dates`].
  pub fn get_valid_start_dates(
    &mut self,
    holding_years: u32,
    lookback_years: u32,
  ) -> Result<Vec<NaiveDate>> {
    let key = (holding_years, lookback_years);
    if let Some(dates) = self.start_dates.get(&key) {
      return Ok(dates.clone());
    }

    let candidates = self.candidate_start_dates(holding_years, lookback_years);
    let n_trials = self.config.n_trials;
    if candidates.len() < n_trials {
      return Err(PortfolioError::InsufficientStartDates {
        found: candidates.len(),
        required: n_trials,
      });
    }

    let mut dates: Vec<NaiveDate> = index::sample(&mut self.rng, candidates.len(), n_trials)
      .into_iter()
      .map(|i| candidates[i])
      .collect();
    dates.sort_unstable();

    debug!(
      holding_years,
      lookback_years,
      candidates = candidates.len(),
      ?dates,
      "sampled start dates"
    );
    self.start_dates.insert(key, dates.clone());
    Ok(dates)
  }

  /// Cached start dates of a horizon under the configured lookback, if already drawn.
  pub fn cached_start_dates(&self, holding_years: u32) -> Option<&[NaiveDate]> {
    self
      .start_dates
      .get(&(holding_years, self.config.lookback_years))
      .map(Vec::as_slice)
  }

  /// Forget every cached horizon. The generator keeps its state.
  pub fn reset_start_dates(&mut self) {
    self.start_dates.clear();
  }

  /// Evaluate `mode` from each sampled start date over `holding_years`.
  ///
  /// Trials that yield no returns, or a historical window that is too short, are skipped with a
  /// warning. Results keep start-date order.
  pub fn run_simulation(&mut self, mode: Mode, holding_years: u32) -> Result<Vec<TrialOutcome>> {
    let dates = self.get_valid_start_dates(holding_years, self.config.lookback_years)?;

    let this = &*self;
    let outcomes: Vec<Option<TrialOutcome>> = if this.config.parallel {
      dates
        .par_iter()
        .map(|&start| this.run_trial(mode, holding_years, start))
        .collect()
    } else {
      dates
        .iter()
        .map(|&start| this.run_trial(mode, holding_years, start))
        .collect()
    };
    let outcomes: Vec<TrialOutcome> = outcomes.into_iter().flatten().collect();

    info!(
      %mode,
      holding_years,
      requested = dates.len(),
      completed = outcomes.len(),
      "simulation finished"
    );
    Ok(outcomes)
  }

  /// [`Simulator::run_simulation`] with each outcome labelled by mode, horizon and 1-based trial.
  pub fn run_and_summarize(&mut self, mode: Mode, holding_years: u32) -> Result<Vec<TrialRecord>> {
    let outcomes = self.run_simulation(mode, holding_years)?;
    Ok(
      outcomes
        .into_iter()
        .enumerate()
        .map(|(i, outcome)| TrialRecord {
          summary: outcome.summary,
          mode,
          years: holding_years,
          trial: i + 1,
          start_date: outcome.start_date,
        })
        .collect(),
    )
  }

  fn run_trial(&self, mode: Mode, holding_years: u32, start: NaiveDate) -> Option<TrialOutcome> {
    let series = match mode {
      Mode::Historical => self.historical_returns(holding_years, start)?,
      Mode::Optimal | Mode::Equal => {
        let end = shift_years(start, holding_years as i32);
        let outcome = self
          .backtester
          .run_backtest(start, end, false, mode == Mode::Equal);
        if outcome.truncated {
          warn!(%mode, %start, %end, days = outcome.returns.len(), "backtest truncated");
        }
        outcome.into_returns().values().to_vec()
      }
    };

    if series.is_empty() {
      warn!(%mode, %start, holding_years, "no returns, skipping trial");
      return None;
    }

    match self.evaluate(&series) {
      Ok(summary) => Some(TrialOutcome {
        start_date: start,
        summary,
      }),
      Err(error) => {
        warn!(%mode, %start, %error, "evaluation failed, skipping trial");
        None
      }
    }
  }

  /// Cross-sectional mean return over `[start - holding, start]`, or `None` when coverage is short.
  fn historical_returns(&self, holding_years: u32, start: NaiveDate) -> Option<Vec<f64>> {
    let returns = self.optimizer.returns();
    let hist_start = shift_years(start, -(holding_years as i32));
    let rows = returns.rows_between(hist_start, start);
    let required =
      self.config.min_history_coverage * f64::from(holding_years) * self.config.trading_days;

    if (rows.len() as f64) < required {
      warn!(
        %start,
        holding_years,
        days = rows.len(),
        required,
        "insufficient history, skipping trial"
      );
      return None;
    }

    Some(
      returns
        .cross_sectional_mean(rows, &self.columns)
        .values()
        .to_vec(),
    )
  }

  fn evaluate(&self, series: &[f64]) -> Result<PerformanceSummary> {
    PerformanceEvaluator::new(series)
      .with_risk_free_rate(self.config.risk_free_rate)
      .with_trading_days(self.config.trading_days)
      .summary()
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use tracing_test::traced_test;

  use super::*;
  use crate::backtest::BacktestConfig;
  use crate::data::PriceTable;
  use crate::data::SyntheticMarket;

  fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn assets() -> Vec<String> {
    vec!["AAA".into(), "BBB".into(), "CCC".into()]
  }

  fn market_until(end: NaiveDate) -> PortfolioOptimizer {
    let start = ymd(2000, 1, 1);
    let market = SyntheticMarket::new(
      vec![
        ("AAA".into(), 0.09, 0.18),
        ("BBB".into(), 0.05, 0.08),
        ("CCC".into(), 0.03, 0.03),
      ],
      start,
      (end - start).num_days() as usize + 1,
      5,
    );
    PortfolioOptimizer::new(&market.prices().unwrap())
  }

  /// Daily market through 2004-01-02 where BBB has no prices from 2002-07-02 to 2003-06-30.
  fn gapped_optimizer() -> PortfolioOptimizer {
    let start = ymd(2000, 1, 1);
    let market = SyntheticMarket::new(
      vec![
        ("AAA".into(), 0.09, 0.18),
        ("BBB".into(), 0.05, 0.08),
        ("CCC".into(), 0.03, 0.03),
      ],
      start,
      (ymd(2004, 1, 2) - start).num_days() as usize + 1,
      5,
    );
    let table = market.prices().unwrap();
    let mut prices = table.prices().clone();
    for (t, d) in table.dates().iter().enumerate() {
      if *d >= ymd(2002, 7, 2) && *d <= ymd(2003, 6, 30) {
        prices[[t, 1]] = f64::NAN;
      }
    }
    let gapped = PriceTable::new(table.dates().to_vec(), table.assets().to_vec(), prices).unwrap();
    PortfolioOptimizer::new(&gapped)
  }

  fn config(n_trials: usize) -> SimulationConfig {
    SimulationConfig {
      n_trials,
      ..Default::default()
    }
  }

  #[test]
  fn eight_years_and_a_day_leave_one_start_date() {
    let opt = market_until(ymd(2008, 1, 2));
    let bt = Backtester::new(&opt, assets()).unwrap();

    let mut sim = Simulator::new(&opt, &bt, assets(), config(1)).unwrap();
    assert_eq!(sim.candidate_start_dates(3, 5), vec![ymd(2005, 1, 2)]);
    assert_eq!(sim.get_valid_start_dates(3, 5).unwrap(), vec![ymd(2005, 1, 2)]);

    let mut sim = Simulator::new(&opt, &bt, assets(), config(2)).unwrap();
    assert!(matches!(
      sim.get_valid_start_dates(3, 5),
      Err(PortfolioError::InsufficientStartDates {
        found: 1,
        required: 2
      })
    ));
    assert!(sim.run_simulation(Mode::Equal, 3).is_err());
  }

  #[test]
  fn modes_share_start_dates() {
    let opt = market_until(ymd(2009, 12, 31));
    let bt = Backtester::new(&opt, assets()).unwrap();
    let mut sim = Simulator::new(&opt, &bt, assets(), config(3)).unwrap();

    let equal = sim.run_and_summarize(Mode::Equal, 2).unwrap();
    let optimal = sim.run_and_summarize(Mode::Optimal, 2).unwrap();
    let cached = sim.cached_start_dates(2).unwrap().to_vec();

    assert_eq!(cached.len(), 3);
    assert!(cached.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(equal.iter().map(|r| r.start_date).collect::<Vec<_>>(), cached);
    assert_eq!(optimal.iter().map(|r| r.start_date).collect::<Vec<_>>(), cached);
    assert_eq!(equal.iter().map(|r| r.trial).collect::<Vec<_>>(), [1, 2, 3]);
    assert!(optimal.iter().all(|r| r.mode == Mode::Optimal && r.years == 2));
    assert!(cached
      .iter()
      .all(|d| *d >= ymd(2005, 1, 2) && *d <= ymd(2007, 12, 31)));
  }

  #[test]
  fn horizons_are_sampled_separately_until_reset() {
    let opt = market_until(ymd(2009, 12, 31));
    let bt = Backtester::new(&opt, assets()).unwrap();
    let mut sim = Simulator::new(&opt, &bt, assets(), config(4)).unwrap();

    let one = sim.get_valid_start_dates(1, 5).unwrap();
    let two = sim.get_valid_start_dates(2, 5).unwrap();
    assert!(two.iter().all(|d| *d <= ymd(2007, 12, 31)));
    assert_eq!(sim.get_valid_start_dates(1, 5).unwrap(), one);
    assert_eq!(sim.cached_start_dates(2).unwrap(), two.as_slice());

    sim.reset_start_dates();
    assert!(sim.cached_start_dates(1).is_none());
    assert!(sim.cached_start_dates(2).is_none());
  }

  #[test]
  fn same_seed_draws_same_dates() {
    let opt = market_until(ymd(2009, 12, 31));
    let bt = Backtester::new(&opt, assets()).unwrap();

    let draw = |seed| {
      let cfg = SimulationConfig {
        seed,
        ..config(5)
      };
      Simulator::new(&opt, &bt, assets(), cfg)
        .unwrap()
        .get_valid_start_dates(3, 5)
        .unwrap()
    };

    assert_eq!(draw(42), draw(42));
    assert_ne!(draw(42), draw(43));
  }

  #[test]
  fn historical_mode_averages_trailing_returns() {
    let opt = market_until(ymd(2009, 12, 31));
    let bt = Backtester::new(&opt, assets()).unwrap();
    let mut sim = Simulator::new(&opt, &bt, assets(), config(2)).unwrap();

    let records = sim.run_and_summarize(Mode::Historical, 3).unwrap();
    assert_eq!(records.len(), 2);

    let first = records[0];
    let returns = opt.returns();
    let rows = returns.rows_between(shift_years(first.start_date, -3), first.start_date);
    let series = returns.cross_sectional_mean(rows, &[0, 1, 2]);
    let expected = PerformanceEvaluator::new(series.values()).summary().unwrap();

    assert_relative_eq!(
      first.summary.annualized_return,
      expected.annualized_return,
      max_relative = 1e-12
    );
    assert_relative_eq!(
      first.summary.annualized_volatility,
      expected.annualized_volatility,
      max_relative = 1e-12
    );
  }

  #[test]
  #[traced_test]
  fn historical_mode_skips_short_history() {
    let opt = market_until(ymd(2006, 12, 31));
    let bt = Backtester::new(&opt, assets()).unwrap();
    let cfg = SimulationConfig {
      lookback_years: 1,
      ..config(3)
    };
    let mut sim = Simulator::new(&opt, &bt, assets(), cfg).unwrap();

    // Start dates fall in the second year, so five-year windows hold at most two years of data.
    let records = sim.run_and_summarize(Mode::Historical, 5).unwrap();

    assert!(records.is_empty());
    assert!(logs_contain("insufficient history"));
  }

  #[test]
  fn skipped_trials_leave_consecutive_numbers() {
    let opt = market_until(ymd(2003, 6, 30));
    let bt = Backtester::new(&opt, assets()).unwrap();
    let lookback_one = |n_trials| SimulationConfig {
      lookback_years: 1,
      ..config(n_trials)
    };

    let candidates = Simulator::new(&opt, &bt, assets(), lookback_one(1))
      .unwrap()
      .candidate_start_dates(2, 1);
    let required = 0.9 * 2.0 * 252.0;
    let survivors: Vec<NaiveDate> = candidates
      .iter()
      .copied()
      .filter(|d| opt.returns().rows_between(shift_years(*d, -2), *d).len() as f64 >= required)
      .collect();
    assert!(!survivors.is_empty() && survivors.len() < candidates.len());
    assert_eq!(survivors[0], ymd(2001, 3, 30));

    // Sampling every candidate makes the draw cover the whole window.
    let mut sim = Simulator::new(&opt, &bt, assets(), lookback_one(candidates.len())).unwrap();
    let records = sim.run_and_summarize(Mode::Historical, 2).unwrap();

    assert_eq!(
      records.iter().map(|r| r.start_date).collect::<Vec<_>>(),
      survivors
    );
    assert_eq!(
      records.iter().map(|r| r.trial).collect::<Vec<_>>(),
      (1..=survivors.len()).collect::<Vec<_>>()
    );
  }

  #[test]
  #[traced_test]
  fn truncated_backtest_still_counts_as_a_trial() {
    let opt = gapped_optimizer();
    let bt = Backtester::with_config(
      &opt,
      assets(),
      BacktestConfig {
        rebalance_months: 18,
        lookback_years: 1,
        ..Default::default()
      },
    )
    .unwrap();
    let cfg = SimulationConfig {
      lookback_years: 2,
      ..config(1)
    };
    let mut sim = Simulator::new(&opt, &bt, assets(), cfg).unwrap();

    // The second period's lookback falls inside the gap and holds a single row.
    let records = sim.run_and_summarize(Mode::Equal, 2).unwrap();
    let outcome = bt.run_backtest(ymd(2002, 1, 2), ymd(2004, 1, 2), false, true);

    assert!(outcome.truncated);
    assert!(matches!(
      outcome.failures[0].error,
      PortfolioError::InsufficientObservations { found: 1, .. }
    ));
    assert_eq!(outcome.returns.dates().last(), Some(&ymd(2002, 7, 1)));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].trial, 1);
    assert_eq!(records[0].start_date, ymd(2002, 1, 2));
    let expected = PerformanceEvaluator::new(outcome.returns.values())
      .summary()
      .unwrap();
    assert_eq!(records[0].summary, expected);
    assert!(logs_contain("backtest truncated"));
  }

  #[test]
  fn parallel_trials_match_sequential() {
    let opt = market_until(ymd(2009, 12, 31));
    let bt = Backtester::new(&opt, assets()).unwrap();

    let run = |parallel| {
      let cfg = SimulationConfig {
        parallel,
        ..config(3)
      };
      Simulator::new(&opt, &bt, assets(), cfg)
        .unwrap()
        .run_simulation(Mode::Equal, 2)
        .unwrap()
    };

    assert_eq!(run(true), run(false));
  }

  #[test]
  fn unknown_asset_is_rejected() {
    let opt = market_until(ymd(2009, 12, 31));
    let bt = Backtester::new(&opt, assets()).unwrap();

    assert!(matches!(
      Simulator::new(&opt, &bt, vec!["ZZZ".into()], config(1)),
      Err(PortfolioError::UnknownAsset(_))
    ));
    assert!(matches!(
      Simulator::new(&opt, &bt, Vec::new(), config(1)),
      Err(PortfolioError::NoAssets)
    ));
  }
}
