//! Kelly Stake Allocation
//!
//! For a combination with win probability p and margin-adjusted decimal
//! odds o (net odds b = o - 1):
//!     f = scale * max((b*p - (1 - p)) / b, 0)
//!
//! scale: 0.25 Conservative, 0.5 Moderate, 1.0 Aggressive
//!
//! Combinations are sized with fractional Kelly on margin-adjusted odds, then
//! the budget is shared in proportion to those fractions. The fractions only
//! decide each combination's share; the whole budget is always distributed
//! once any combination has a positive edge.

use tracing::debug;

use super::allocation::{AllocatedStake, Allocation, StakeAllocator};
use super::combination::Combination;
use crate::error::{validate_budget, StrategyError};
use crate::models::{AllocationMethod, RiskPreference};

impl RiskPreference {
    /// Kelly multiplier (0.25 = quarter Kelly)
    pub fn kelly_scale(&self) -> f64 {
        match self {
            RiskPreference::Conservative => 0.25,
            RiskPreference::Moderate => 0.5,
            RiskPreference::Aggressive => 1.0,
        }
    }
}

/// Full Kelly fraction `(p * odds - 1) / (odds - 1)`
///
/// Negative when the bet has no edge. Zero when `odds <= 1`.
///
/// ```
/// use betting_strategy::core::kelly::calculate_kelly_fraction;
/// // 2.0 x 1.5 accumulator at 42% after a 5% margin: odds 2.85
/// let f = calculate_kelly_fraction(0.42, 2.85);
/// assert!((f - (1.85 * 0.42 - 0.58) / 1.85).abs() < 1e-12);
/// ```
pub fn calculate_kelly_fraction(probability: f64, odds: f64) -> f64 {
    let b = odds - 1.0;
    if b <= 0.0 {
        return 0.0;
    }
    (probability * odds - 1.0) / b
}

/// Scaled Kelly fraction, clamped at zero
///
/// Returns 0 when the net odds are not positive or the probability is not
/// strictly inside (0, 1).
///
/// ```
/// use betting_strategy::core::kelly::fractional_kelly;
/// // Half Kelly on a 25% shot at 5.0
/// assert!((fractional_kelly(0.25, 5.0, 0.5) - 0.03125).abs() < 1e-12);
/// assert_eq!(fractional_kelly(0.10, 5.0, 0.5), 0.0);
/// ```
pub fn fractional_kelly(probability: f64, odds: f64, scale: f64) -> f64 {
    if !(probability > 0.0 && probability < 1.0) {
        return 0.0;
    }
    scale * calculate_kelly_fraction(probability, odds).max(0.0)
}

/// Share `total_budget` in proportion to `weights`
///
/// All stakes are zero when no weight is positive.
pub fn normalize_stakes(weights: &[f64], total_budget: f64) -> Vec<f64> {
    let total: f64 = weights.iter().sum();

    if total <= 0.0 {
        return vec![0.0; weights.len()];
    }

    weights.iter().map(|w| w / total * total_budget).collect()
}

/// Proportional fractional-Kelly allocator
#[derive(Debug, Clone, Default)]
pub struct KellyAllocator {
    /// Overrides the risk preference multiplier when set
    pub kelly_multiplier: Option<f64>,
}

impl KellyAllocator {
    pub fn new(kelly_multiplier: f64) -> Self {
        Self {
            kelly_multiplier: Some(kelly_multiplier),
        }
    }

    fn scale(&self, risk_preference: RiskPreference) -> f64 {
        self.kelly_multiplier
            .unwrap_or_else(|| risk_preference.kelly_scale())
    }
}

impl StakeAllocator for KellyAllocator {
    fn method(&self) -> AllocationMethod {
        AllocationMethod::Kelly
    }

    fn allocate(
        &self,
        combinations: &[Combination],
        total_budget: f64,
        risk_preference: RiskPreference,
    ) -> Result<Allocation, StrategyError> {
        validate_budget(total_budget)?;
        let scale = self.scale(risk_preference);

        let adjusted: Vec<f64> = combinations.iter().map(|c| c.adjusted_odds()).collect();
        let weights: Vec<f64> = combinations
            .iter()
            .zip(&adjusted)
            .map(|(c, &odds)| fractional_kelly(c.combined_prob(), odds, scale))
            .collect();

        let stakes = normalize_stakes(&weights, total_budget);

        debug!(
            "Kelly allocation (x{}): {} of {} combinations funded",
            scale,
            weights.iter().filter(|&&w| w > 0.0).count(),
            combinations.len()
        );

        let entries = adjusted
            .into_iter()
            .zip(weights)
            .zip(stakes)
            .map(|((adjusted_odds, weight), stake)| AllocatedStake {
                adjusted_odds,
                weight,
                stake,
            })
            .collect();

        Ok(Allocation {
            method: AllocationMethod::Kelly,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bet;
    use std::sync::Arc;

    fn combo(legs: &[(f64, f64)]) -> Combination {
        let bets = legs
            .iter()
            .enumerate()
            .map(|(i, (odds, conf))| Arc::new(Bet::new(format!("L{}", i), *odds, *conf).unwrap()))
            .collect();
        Combination::new(bets)
    }

    #[test]
    fn test_full_kelly_matches_edge_formula() {
        // (b p - q) / b with b = odds - 1
        for &(p, odds) in &[(0.6, 2.0), (0.42, 2.85), (0.3, 4.0)] {
            let b: f64 = odds - 1.0;
            let expected = (b * p - (1.0 - p)) / b;
            assert!((calculate_kelly_fraction(p, odds) - expected).abs() < 1e-12);
        }
        assert!(calculate_kelly_fraction(0.2, 3.0) < 0.0);
        assert_eq!(calculate_kelly_fraction(0.9, 1.0), 0.0);
        assert_eq!(calculate_kelly_fraction(0.9, 0.5), 0.0);
    }

    #[test]
    fn test_fractional_kelly_scales_full_kelly() {
        let full = calculate_kelly_fraction(0.6, 2.0);
        assert!((fractional_kelly(0.6, 2.0, 0.5) - 0.5 * full).abs() < 1e-12);
    }

    #[test]
    fn test_fractional_kelly_scales_and_clamps() {
        let full = fractional_kelly(0.25, 5.0, 1.0);
        assert!((full - 0.0625).abs() < 1e-12);
        assert!((fractional_kelly(0.25, 5.0, 0.25) - full * 0.25).abs() < 1e-12);
        assert_eq!(fractional_kelly(0.10, 5.0, 1.0), 0.0);
    }

    #[test]
    fn test_fractional_kelly_degenerate_inputs() {
        assert_eq!(fractional_kelly(0.5, 1.0, 1.0), 0.0);
        assert_eq!(fractional_kelly(0.5, 0.9, 1.0), 0.0);
        assert_eq!(fractional_kelly(0.0, 3.0, 1.0), 0.0);
        assert_eq!(fractional_kelly(1.0, 3.0, 1.0), 0.0);
        assert_eq!(fractional_kelly(f64::NAN, 3.0, 1.0), 0.0);
    }

    #[test]
    fn test_kelly_scale_by_risk() {
        assert_eq!(RiskPreference::Conservative.kelly_scale(), 0.25);
        assert_eq!(RiskPreference::Moderate.kelly_scale(), 0.5);
        assert_eq!(RiskPreference::Aggressive.kelly_scale(), 1.0);
    }

    #[test]
    fn test_normalize_stakes_proportional() {
        let stakes = normalize_stakes(&[0.1, 0.3], 100.0);
        assert!((stakes[0] - 25.0).abs() < 1e-9);
        assert!((stakes[1] - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_stakes_no_edge() {
        assert_eq!(normalize_stakes(&[0.0, 0.0, 0.0], 100.0), vec![0.0; 3]);
        assert!(normalize_stakes(&[], 100.0).is_empty());
    }

    #[test]
    fn test_allocate_uses_adjusted_odds() {
        // 2.0 x 1.5 at 42%: b = 3.0 * 0.95 - 1 = 1.85
        let combos = vec![combo(&[(2.0, 60.0), (1.5, 70.0)])];
        let allocation = KellyAllocator::new(1.0)
            .allocate(&combos, 100.0, RiskPreference::Moderate)
            .unwrap();

        let entry = allocation.entries[0];
        let expected = (1.85 * 0.42 - 0.58) / 1.85;
        assert!((entry.adjusted_odds - 2.85).abs() < 1e-9);
        assert!((entry.weight - expected).abs() < 1e-9);
        assert!((entry.stake - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_allocate_sums_to_budget() {
        let combos = vec![
            combo(&[(2.0, 60.0)]),
            combo(&[(3.0, 45.0)]),
            combo(&[(1.5, 75.0)]),
            combo(&[(2.0, 30.0)]),
        ];
        let allocation = KellyAllocator::default()
            .allocate(&combos, 100.0, RiskPreference::Moderate)
            .unwrap();

        assert_eq!(allocation.len(), combos.len());
        assert!((allocation.total_stake() - 100.0).abs() < 1e-9);
        assert!(allocation.entries.iter().all(|e| e.stake >= 0.0));
        // negative edge gets nothing
        assert_eq!(allocation.entries[3].stake, 0.0);
    }

    #[test]
    fn test_risk_scale_does_not_change_shares() {
        let combos = vec![combo(&[(2.0, 60.0)]), combo(&[(3.0, 45.0)])];
        let conservative = KellyAllocator::default()
            .allocate(&combos, 100.0, RiskPreference::Conservative)
            .unwrap();
        let aggressive = KellyAllocator::default()
            .allocate(&combos, 100.0, RiskPreference::Aggressive)
            .unwrap();

        assert!((aggressive.entries[0].weight - 4.0 * conservative.entries[0].weight).abs() < 1e-12);
        for (a, c) in aggressive.entries.iter().zip(&conservative.entries) {
            assert!((a.stake - c.stake).abs() < 1e-9);
        }
    }

    #[test]
    fn test_allocate_without_edge() {
        let combos = vec![combo(&[(2.0, 40.0)]), combo(&[(1.5, 50.0)])];
        let allocation = KellyAllocator::default()
            .allocate(&combos, 100.0, RiskPreference::Aggressive)
            .unwrap();

        assert_eq!(allocation.stakes(), vec![0.0, 0.0]);
        assert_eq!(allocation.total_stake(), 0.0);
    }

    #[test]
    fn test_allocate_rejects_bad_budget() {
        let combos = vec![combo(&[(2.0, 60.0)])];
        assert!(KellyAllocator::default()
            .allocate(&combos, 0.0, RiskPreference::Moderate)
            .is_err());
    }
}
