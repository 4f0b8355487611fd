//! Mean-Variance Stake Allocation
//!
//! Treats each combination as an asset with return `ev_per_dollar` and
//! win variance `p(1 - p)`, then solves
//!
//! ```text
//! minimize  -(w · r) + λ · wᵀ Σ w
//! s.t.      w ≥ 0, Σ w = 1
//! ```
//!
//! by projected gradient descent. Σ is diagonal: combinations sharing legs
//! are still treated as independent.

use ndarray::{Array1, Array2};
use tracing::debug;

use super::allocation::{AllocatedStake, Allocation, StakeAllocator};
use super::combination::Combination;
use crate::error::{validate_budget, StrategyError};
use crate::models::{AllocationMethod, RiskPreference};

impl RiskPreference {
    /// Risk aversion λ for the mean-variance objective
    pub fn risk_aversion(&self) -> f64 {
        match self {
            RiskPreference::Conservative => 5.0,
            RiskPreference::Moderate => 2.5,
            RiskPreference::Aggressive => 1.0,
        }
    }
}

/// Diagonal covariance of combination outcomes
pub fn diagonal_covariance(combinations: &[Combination]) -> Array2<f64> {
    let variances: Array1<f64> = combinations
        .iter()
        .map(|c| {
            let p = c.combined_prob();
            p * (1.0 - p)
        })
        .collect();
    Array2::from_diag(&variances)
}

/// Euclidean projection onto the probability simplex
pub fn project_to_simplex(v: &Array1<f64>) -> Array1<f64> {
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (i, &u) in sorted.iter().enumerate() {
        cumulative += u;
        let t = (cumulative - 1.0) / (i + 1) as f64;
        if u - t > 0.0 {
            theta = t;
        }
    }

    v.mapv(|x| (x - theta).max(0.0))
}

/// Mean-variance portfolio allocator
#[derive(Debug, Clone)]
pub struct MeanVarianceAllocator {
    pub max_iterations: usize,
    /// Convergence threshold on the largest weight change per iteration
    pub tolerance: f64,
    /// Overrides the risk preference λ when set
    pub risk_aversion: Option<f64>,
}

impl Default for MeanVarianceAllocator {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            tolerance: 1e-10,
            risk_aversion: None,
        }
    }
}

impl MeanVarianceAllocator {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
            risk_aversion: None,
        }
    }

    /// Solve for simplex weights
    pub fn optimize(
        &self,
        returns: &Array1<f64>,
        covariance: &Array2<f64>,
        risk_aversion: f64,
    ) -> Result<Array1<f64>, StrategyError> {
        let n = returns.len();
        if n == 0 {
            return Ok(Array1::zeros(0));
        }
        if covariance.dim() != (n, n) {
            return Err(StrategyError::Optimization(format!(
                "covariance is {:?}, expected ({}, {})",
                covariance.dim(),
                n,
                n
            )));
        }

        let variances = covariance.diag().to_owned();
        if returns.iter().chain(variances.iter()).any(|x| !x.is_finite()) {
            return Err(StrategyError::Optimization(
                "non-finite returns or variances".to_string(),
            ));
        }

        // Step 1/L where L is the gradient's Lipschitz constant
        let lipschitz = 2.0 * risk_aversion * variances.iter().cloned().fold(0.0, f64::max);
        let step = if lipschitz > 0.0 { 1.0 / lipschitz } else { 1.0 };

        let mut weights = Array1::from_elem(n, 1.0 / n as f64);

        for iteration in 1..=self.max_iterations {
            let gradient = &variances * &weights * (2.0 * risk_aversion) - returns;
            let next = project_to_simplex(&(&weights - &(gradient * step)));

            if next.iter().any(|w| !w.is_finite()) {
                return Err(StrategyError::Optimization(format!(
                    "weights diverged at iteration {}",
                    iteration
                )));
            }

            let change = (&next - &weights)
                .iter()
                .fold(0.0_f64, |max, d| max.max(d.abs()));
            weights = next;

            if change < self.tolerance {
                debug!(
                    "Mean-variance converged after {} iterations (λ = {})",
                    iteration, risk_aversion
                );
                return Ok(weights);
            }
        }

        Err(StrategyError::Optimization(format!(
            "solver did not converge after {} iterations",
            self.max_iterations
        )))
    }
}

impl StakeAllocator for MeanVarianceAllocator {
    fn method(&self) -> AllocationMethod {
        AllocationMethod::MeanVariance
    }

    fn allocate(
        &self,
        combinations: &[Combination],
        total_budget: f64,
        risk_preference: RiskPreference,
    ) -> Result<Allocation, StrategyError> {
        validate_budget(total_budget)?;

        let returns: Array1<f64> = combinations.iter().map(|c| c.ev_per_dollar()).collect();
        let covariance = diagonal_covariance(combinations);
        let risk_aversion = self
            .risk_aversion
            .unwrap_or_else(|| risk_preference.risk_aversion());

        let weights = self.optimize(&returns, &covariance, risk_aversion)?;

        let entries = combinations
            .iter()
            .zip(weights.iter())
            .map(|(c, &w)| AllocatedStake {
                adjusted_odds: c.adjusted_odds(),
                weight: w,
                stake: w * total_budget,
            })
            .collect();

        Ok(Allocation {
            method: AllocationMethod::MeanVariance,
            entries,
        })
    }
}
