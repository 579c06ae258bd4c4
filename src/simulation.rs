//! # Simulation
//!
//! $$
//! \tau^{(1)},\dots,\tau^{(N)} \sim \operatorname{Unif}\big\{\tau : t_0 + L \le \tau \le t_{\text{end}} - H\big\}
//! $$
//!
//! Monte Carlo comparison of rebalancing strategies over randomly drawn historical start dates.

pub mod config;
pub mod simulator;
pub mod trial;

pub use config::SimulationConfig;
pub use simulator::Simulator;
pub use trial::Mode;
pub use trial::TrialOutcome;
pub use trial::TrialRecord;
