//! Stake allocation output and allocator selection

use serde::{Deserialize, Serialize};

use super::combination::Combination;
use super::kelly::KellyAllocator;
use super::mean_variance::MeanVarianceAllocator;
use crate::error::StrategyError;
use crate::models::{AllocationMethod, RiskPreference};

/// Allocator output for one combination
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocatedStake {
    /// Combined odds after the bookmaker margin
    pub adjusted_odds: f64,
    /// Weight before budget scaling (fractional Kelly value or portfolio weight)
    pub weight: f64,
    pub stake: f64,
}

/// Stakes index-aligned with the combinations they were computed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub method: AllocationMethod,
    pub entries: Vec<AllocatedStake>,
}

impl Allocation {
    pub fn empty(method: AllocationMethod) -> Self {
        Self {
            method,
            entries: Vec::new(),
        }
    }

    pub fn stakes(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.stake).collect()
    }

    pub fn total_stake(&self) -> f64 {
        self.entries.iter().map(|e| e.stake).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Distributes a budget across ranked combinations
pub trait StakeAllocator {
    fn method(&self) -> AllocationMethod;

    /// Compute one stake per combination; stakes are non-negative and sum to
    /// at most `total_budget`
    fn allocate(
        &self,
        combinations: &[Combination],
        total_budget: f64,
        risk_preference: RiskPreference,
    ) -> Result<Allocation, StrategyError>;
}

/// Allocator with default settings for a method
pub fn allocator_for(method: AllocationMethod) -> Box<dyn StakeAllocator> {
    match method {
        AllocationMethod::Kelly => Box::new(KellyAllocator::default()),
        AllocationMethod::MeanVariance => Box::new(MeanVarianceAllocator::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bet;
    use std::sync::Arc;

    fn combos() -> Vec<Combination> {
        vec![
            Combination::new(vec![Arc::new(Bet::new("A", 2.0, 60.0).unwrap())]),
            Combination::new(vec![Arc::new(Bet::new("B", 3.0, 45.0).unwrap())]),
        ]
    }

    #[test]
    fn test_allocator_for_method() {
        for method in AllocationMethod::ALL {
            assert_eq!(allocator_for(method).method(), method);
        }
    }

    #[test]
    fn test_every_allocator_respects_budget() {
        for method in AllocationMethod::ALL {
            let allocation = allocator_for(method)
                .allocate(&combos(), 250.0, RiskPreference::Moderate)
                .unwrap();

            assert_eq!(allocation.method, method);
            assert_eq!(allocation.len(), 2);
            assert!(allocation.entries.iter().all(|e| e.stake >= 0.0));
            assert!(allocation.total_stake() <= 250.0 + 1e-9);
        }
    }

    #[test]
    fn test_empty_allocation() {
        let allocation = Allocation::empty(AllocationMethod::Kelly);
        assert!(allocation.is_empty());
        assert_eq!(allocation.total_stake(), 0.0);
        assert!(allocation.stakes().is_empty());
    }
}
