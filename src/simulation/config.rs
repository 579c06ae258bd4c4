use crate::performance::TRADING_DAYS;

/// Runtime configuration for [`super::Simulator`].
#[derive(Clone, Debug)]
pub struct SimulationConfig {
  /// Start dates drawn per horizon.
  pub n_trials: usize,
  /// Years of history required before the earliest start date.
  pub lookback_years: u32,
  /// Seed of the start-date sampler.
  pub seed: u64,
  pub trading_days: f64,
  /// Fraction of `holding_years * trading_days` a historical window must cover.
  pub min_history_coverage: f64,
  /// Annual risk-free rate used for the Sharpe ratio of every trial.
  pub risk_free_rate: f64,
  /// Evaluate trials on the rayon pool.
  pub parallel: bool,
}

impl Default for SimulationConfig {
  fn default() -> Self {
    Self {
      n_trials: 5,
      lookback_years: 5,
      seed: 42,
      trading_days: TRADING_DAYS,
      min_history_coverage: 0.9,
      risk_free_rate: 0.0,
      parallel: false,
    }
  }
}
