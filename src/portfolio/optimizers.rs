//! # Portfolio Optimizers
//!
//! $$
//! \mathbf{w}_{\text{tan}} \propto \Sigma^{-1}\mu
//! $$
//!
//! Closed-form tangency weights, the long-only max-Sharpe search and the equal-weight heuristic.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::solver::neldermead::NelderMead;
use nalgebra::DMatrix;
use nalgebra::DVector;

use super::types::OptimizerConfig;
use super::types::PortfolioResult;
use crate::error::PortfolioError;
use crate::error::Result;

fn softmax(x: &[f64]) -> Vec<f64> {
  if x.is_empty() {
    return Vec::new();
  }

  let max_x = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
  let exps: Vec<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum: f64 = exps.iter().sum();

  if sum < 1e-15 {
    vec![1.0 / x.len() as f64; x.len()]
  } else {
    exps.iter().map(|&e| e / sum).collect()
  }
}

fn check_dimensions(mu: &DVector<f64>, sigma: &DMatrix<f64>) -> Result<()> {
  if sigma.nrows() != mu.len() || sigma.ncols() != mu.len() {
    return Err(PortfolioError::OptimizationFailed(format!(
      "covariance is {}x{} but {} expected returns were given",
      sigma.nrows(),
      sigma.ncols(),
      mu.len()
    )));
  }
  if mu.is_empty() {
    return Err(PortfolioError::OptimizationFailed("no assets".into()));
  }
  if mu.iter().chain(sigma.iter()).any(|v| !v.is_finite()) {
    return Err(PortfolioError::OptimizationFailed(
      "non-finite moment estimates".into(),
    ));
  }
  Ok(())
}

/// `1/n` for each of `n` assets.
pub fn equal_weights(n: usize) -> Vec<f64> {
  if n == 0 {
    return Vec::new();
  }
  vec![1.0 / n as f64; n]
}

/// Unconstrained tangency portfolio `Σ⁻¹μ`, rescaled to sum to one. Short positions allowed.
pub fn tangency_weights(mu: &DVector<f64>, sigma: &DMatrix<f64>) -> Result<Vec<f64>> {
  check_dimensions(mu, sigma)?;

  let eps = sigma.amax().max(f64::MIN_POSITIVE) * 1e-12;
  if sigma.rank(eps) < mu.len() {
    return Err(PortfolioError::SingularCovariance);
  }

  let raw = sigma
    .clone()
    .lu()
    .solve(mu)
    .ok_or(PortfolioError::SingularCovariance)?;

  let total = raw.sum();
  if !total.is_finite() || total.abs() < 1e-12 {
    return Err(PortfolioError::OptimizationFailed(
      "tangency weights cannot be normalized (net exposure is zero)".into(),
    ));
  }

  Ok(raw.iter().map(|w| w / total).collect())
}

#[derive(Clone)]
struct NegativeSharpe {
  mu: DVector<f64>,
  sigma: DMatrix<f64>,
}

impl CostFunction for NegativeSharpe {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let w = DVector::from_vec(softmax(x));
    let port_ret = w.dot(&self.mu);
    let port_var = w.dot(&(&self.sigma * &w));
    if port_var <= 1e-30 {
      return Ok(1e10);
    }
    Ok(-port_ret / port_var.sqrt())
  }
}

/// Nelder-Mead from a unit simplex around `x0`; any stop other than convergence is an error.
fn nelder_mead(cost: NegativeSharpe, x0: Vec<f64>, config: &OptimizerConfig) -> Result<Vec<f64>> {
  let mut simplex = Vec::with_capacity(x0.len() + 1);
  simplex.push(x0.clone());
  for i in 0..x0.len() {
    let mut point = x0.clone();
    point[i] += 1.0;
    simplex.push(point);
  }

  let solver = NelderMead::new(simplex)
    .with_sd_tolerance(config.sd_tolerance)
    .map_err(|e| PortfolioError::OptimizationFailed(e.to_string()))?;

  let res = Executor::new(cost, solver)
    .configure(|state| state.max_iters(config.max_iters))
    .run()
    .map_err(|e| PortfolioError::OptimizationFailed(e.to_string()))?;

  match res.state().get_termination_reason() {
    Some(TerminationReason::SolverConverged) | Some(TerminationReason::TargetCostReached) => {}
    other => {
      return Err(PortfolioError::OptimizationFailed(format!(
        "Nelder-Mead did not converge ({other:?})"
      )))
    }
  }

  res
    .state
    .best_param
    .ok_or_else(|| PortfolioError::OptimizationFailed("solver returned no parameters".into()))
}

/// Long-only max-Sharpe weights: `0 <= w_i <= 1`, `sum(w) = 1`.
///
/// The simplex constraint is enforced by a softmax reparameterisation and the objective is
/// searched with Nelder-Mead starting from the equal-weight point, then restarted once from the
/// converged point. A search that stops for any reason other than convergence is reported as
/// [`PortfolioError::OptimizationFailed`].
pub fn max_sharpe_long_only(
  mu: &DVector<f64>,
  sigma: &DMatrix<f64>,
  config: &OptimizerConfig,
) -> Result<Vec<f64>> {
  check_dimensions(mu, sigma)?;
  let n = mu.len();
  if n == 1 {
    return Ok(vec![1.0]);
  }

  let cost = NegativeSharpe {
    mu: mu.clone(),
    sigma: sigma.clone(),
  };

  // x0 = 0 maps to equal weights under softmax.
  let first = nelder_mead(cost.clone(), vec![0.0; n], config)?;
  // Restart once around the first answer; a collapsed simplex can stop early.
  let best_x = nelder_mead(cost, first, config)?;
  let w = softmax(&best_x);

  if w.iter().any(|v| !v.is_finite()) {
    return Err(PortfolioError::OptimizationFailed(
      "non-finite weights".into(),
    ));
  }

  Ok(w)
}

/// Model return, volatility and Sharpe ratio of `weights` under `(mu, sigma)`.
pub fn portfolio_statistics(
  weights: &[f64],
  mu: &DVector<f64>,
  sigma: &DMatrix<f64>,
  risk_free: f64,
) -> PortfolioResult {
  let w = DVector::from_column_slice(weights);
  let expected_return = w.dot(mu);
  let volatility = w.dot(&(sigma * &w)).max(0.0).sqrt();
  let sharpe = if volatility > 1e-15 {
    (expected_return - risk_free) / volatility
  } else {
    0.0
  };

  PortfolioResult {
    weights: weights.to_vec(),
    expected_return,
    volatility,
    sharpe,
  }
}
