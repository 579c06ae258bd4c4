//! # Portfolio
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\mathbf{w}^\top\mu}{\sqrt{\mathbf{w}^\top \Sigma \mathbf{w}}}
//! $$
//!
//! Parameter estimation and max-Sharpe weight optimization.

pub mod optimizer;
pub mod optimizers;
pub mod types;

pub use optimizer::PortfolioOptimizer;
pub use optimizers::equal_weights;
pub use optimizers::max_sharpe_long_only;
pub use optimizers::portfolio_statistics;
pub use optimizers::tangency_weights;
pub use types::OptimizerConfig;
pub use types::ParameterEstimate;
pub use types::PortfolioResult;
