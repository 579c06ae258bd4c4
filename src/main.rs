use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use portfolio_mc::backtest::BacktestConfig;
use portfolio_mc::backtest::Backtester;
use portfolio_mc::backtest::FailurePolicy;
use portfolio_mc::data::load_price_table;
use portfolio_mc::data::price_sources;
use portfolio_mc::data::PriceTable;
use portfolio_mc::data::SyntheticMarket;
use portfolio_mc::portfolio::PortfolioOptimizer;
use portfolio_mc::report::SummaryTable;
use portfolio_mc::simulation::Mode;
use portfolio_mc::simulation::SimulationConfig;
use portfolio_mc::simulation::Simulator;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_ASSETS: [&str; 10] = [
  "VTSMX", "VGSIX", "VTMGX", "VEIEX", "NAESX", "VIVAX", "VISVX", "VIPSX", "VBMFX", "VFISX",
];

#[derive(Parser, Debug)]
#[command(
  version,
  about = "Monte Carlo comparison of max-Sharpe, equal-weight and historical portfolios"
)]
struct Args {
  /// Directory holding one `<ASSET>.csv` file with `Date` and `Adj Close` columns per asset
  #[arg(long, default_value = "data")]
  data_dir: PathBuf,

  /// Comma-separated asset identifiers
  #[arg(long, value_delimiter = ',', default_values = DEFAULT_ASSETS)]
  assets: Vec<String>,

  /// Comma-separated holding horizons in years
  #[arg(long, value_delimiter = ',', default_values_t = [3u32, 5])]
  horizons: Vec<u32>,

  /// Start dates drawn per horizon
  #[arg(long, default_value_t = 5)]
  trials: usize,

  /// Seed of the start-date sampler
  #[arg(long, default_value_t = 42)]
  seed: u64,

  /// Annual risk-free rate for Sharpe ratios
  #[arg(long, default_value_t = 0.0)]
  risk_free: f64,

  /// Directory for the CSV outputs
  #[arg(long, default_value = "output")]
  output: PathBuf,

  /// Evaluate trials on the rayon thread pool
  #[arg(long)]
  parallel: bool,

  /// Skip a failing rebalance period instead of truncating the backtest
  #[arg(long)]
  skip_failed_periods: bool,

  /// Use seeded GBM prices instead of reading CSV files
  #[arg(long)]
  synthetic: bool,
}

fn synthetic_prices(assets: &[String], seed: u64) -> anyhow::Result<PriceTable> {
  let params = assets
    .iter()
    .enumerate()
    .map(|(i, a)| {
      let step = i as f64 / assets.len().max(1) as f64;
      (a.clone(), 0.02 + 0.08 * step, 0.03 + 0.2 * step)
    })
    .collect();
  let start = NaiveDate::from_ymd_opt(1996, 1, 1).context("invalid synthetic start date")?;

  Ok(SyntheticMarket::new(params, start, 365 * 29, seed).prices()?)
}

fn main() -> anyhow::Result<()> {
  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("portfolio_mc=info,info"));
  tracing_subscriber::fmt().with_env_filter(env_filter).init();
  let args = Args::parse();

  let prices = if args.synthetic {
    synthetic_prices(&args.assets, args.seed)?
  } else {
    load_price_table(&price_sources(&args.data_dir, &args.assets))
      .with_context(|| format!("loading prices from {}", args.data_dir.display()))?
  };
  info!(dates = prices.len(), assets = prices.assets().len(), "price table ready");

  let optimizer = PortfolioOptimizer::new(&prices);
  let failure_policy = if args.skip_failed_periods {
    FailurePolicy::SkipPeriod
  } else {
    FailurePolicy::Truncate
  };
  let backtester = Backtester::with_config(
    &optimizer,
    args.assets.clone(),
    BacktestConfig {
      failure_policy,
      ..Default::default()
    },
  )?;
  let mut simulator = Simulator::new(
    &optimizer,
    &backtester,
    args.assets.clone(),
    SimulationConfig {
      n_trials: args.trials,
      seed: args.seed,
      risk_free_rate: args.risk_free,
      parallel: args.parallel,
      ..Default::default()
    },
  )?;

  let mut table = SummaryTable::new();
  for &years in &args.horizons {
    for mode in Mode::ALL {
      let records = simulator
        .run_and_summarize(mode, years)
        .with_context(|| format!("simulating {mode} over {years} years"))?;
      table.extend(records);
    }
  }

  table.print();
  table
    .write_csv(&args.output)
    .with_context(|| format!("writing results to {}", args.output.display()))?;

  Ok(())
}
