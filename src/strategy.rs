//! Betting strategy aggregate and processing pipeline
//!
//! Bets → combinations → filtered / ranked combinations → stakes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::allocation::{allocator_for, AllocatedStake, Allocation, StakeAllocator};
use crate::core::combination::{
    count_combinations, Combination, CombinationBuilder, DEFAULT_MARGIN, MAX_ENUMERATION,
};
use crate::core::risk::MAX_COMBINATIONS;
use crate::error::{
    validate_budget, validate_enumeration_size, validate_folds, validate_unique_names,
    StrategyError,
};
use crate::models::{AllocationMethod, Bet, RiskPreference, StrategyType};

/// Floating-point slack allowed on the budget invariant
const BUDGET_TOLERANCE: f64 = 1e-6;

/// Strategy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub total_budget: f64,
    pub strategy_type: StrategyType,
    /// Legs for Accumulator / Parlay, maximum subset size for System
    pub folds: Option<usize>,
    pub risk_preference: RiskPreference,
    pub allocation_method: AllocationMethod,
    /// Bookmaker overround removed from combined odds
    pub margin: f64,
    /// Ranked combinations kept for allocation
    pub max_combinations: usize,
    /// System subsets a run may enumerate
    pub max_enumeration: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            total_budget: 100.0,
            strategy_type: StrategyType::Accumulator,
            folds: None,
            risk_preference: RiskPreference::Moderate,
            allocation_method: AllocationMethod::Kelly,
            margin: DEFAULT_MARGIN,
            max_combinations: MAX_COMBINATIONS,
            max_enumeration: MAX_ENUMERATION,
        }
    }
}

impl StrategyConfig {
    pub fn new(
        total_budget: f64,
        strategy_type: StrategyType,
        risk_preference: RiskPreference,
    ) -> Self {
        Self {
            total_budget,
            strategy_type,
            risk_preference,
            ..Self::default()
        }
    }

    pub fn with_folds(mut self, folds: Option<usize>) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_allocation_method(mut self, method: AllocationMethod) -> Self {
        self.allocation_method = method;
        self
    }

    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_max_combinations(mut self, max_combinations: usize) -> Self {
        self.max_combinations = max_combinations;
        self
    }

    pub fn with_max_enumeration(mut self, max_enumeration: u64) -> Self {
        self.max_enumeration = max_enumeration;
        self
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        validate_budget(self.total_budget)?;
        if !(0.0..1.0).contains(&self.margin) {
            return Err(StrategyError::Validation(format!(
                "Margin must be in [0, 1), got {}",
                self.margin
            )));
        }
        if self.max_combinations == 0 {
            return Err(StrategyError::validation(
                "Maximum number of combinations must be greater than zero",
            ));
        }
        if self.max_enumeration == 0 {
            return Err(StrategyError::validation(
                "Enumeration limit must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Fold count for a bet list
    ///
    /// Accumulator / Parlay always use every bet. System folds must not exceed
    /// the number of bets; `None` leaves the subset size unconstrained.
    pub fn resolve_folds(&self, bet_count: usize) -> Result<Option<usize>, StrategyError> {
        if self.strategy_type.uses_all_legs() {
            return Ok(Some(bet_count));
        }
        match self.folds {
            Some(folds) => {
                validate_folds(folds, bet_count)?;
                Ok(Some(folds))
            }
            None => Ok(None),
        }
    }

    /// Number of combinations a run over `bet_count` bets enumerates
    pub fn enumeration_size(&self, bet_count: usize) -> u128 {
        if bet_count == 0 {
            return 0;
        }
        if self.strategy_type.uses_all_legs() {
            return 1;
        }
        let max_size = self.folds.unwrap_or(bet_count).min(bet_count);
        count_combinations(bet_count, self.risk_preference.min_system_size(), max_size)
    }
}

/// Totals over a processed strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub combination_count: usize,
    pub funded_count: usize,
    pub total_budget: f64,
    pub total_stake: f64,
    pub total_potential_payout: f64,
    /// Σ stake × ev_per_dollar
    pub expected_profit: f64,
}

/// Payout if every leg of the combination wins
pub fn potential_payout(combination: &Combination, stake: f64) -> f64 {
    combination.combined_odds() * stake
}

/// Configuration plus ranked combinations and their stakes
#[derive(Debug, Clone)]
pub struct BettingStrategy {
    pub config: StrategyConfig,
    combinations: Vec<Combination>,
    allocation: Allocation,
}

impl BettingStrategy {
    /// Strategy with no combinations
    pub fn new(config: StrategyConfig) -> Self {
        let method = config.allocation_method;
        Self {
            config,
            combinations: Vec::new(),
            allocation: Allocation::empty(method),
        }
    }

    /// Assemble a strategy, checking stake alignment and the budget
    pub fn from_parts(
        config: StrategyConfig,
        combinations: Vec<Combination>,
        allocation: Allocation,
    ) -> Result<Self, StrategyError> {
        check_allocation(&combinations, &allocation, config.total_budget)?;
        Ok(Self {
            config,
            combinations,
            allocation,
        })
    }

    pub fn total_budget(&self) -> f64 {
        self.config.total_budget
    }

    pub fn strategy_type(&self) -> StrategyType {
        self.config.strategy_type
    }

    pub fn folds(&self) -> Option<usize> {
        self.config.folds
    }

    pub fn risk_preference(&self) -> RiskPreference {
        self.config.risk_preference
    }

    pub fn combinations(&self) -> &[Combination] {
        &self.combinations
    }

    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    /// Stakes index-aligned with `combinations()`
    pub fn stake_allocation(&self) -> Vec<f64> {
        self.allocation.stakes()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    /// Combinations paired with their allocator output
    pub fn entries(&self) -> impl Iterator<Item = (&Combination, &AllocatedStake)> {
        self.combinations.iter().zip(self.allocation.entries.iter())
    }

    /// Entries sorted by stake, largest first
    pub fn ranked_by_stake(&self) -> Vec<(&Combination, &AllocatedStake)> {
        let mut entries: Vec<_> = self.entries().collect();
        entries.sort_by(|a, b| {
            b.1.stake
                .partial_cmp(&a.1.stake)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        entries
    }

    /// Recompute stakes for the current combinations
    ///
    /// The previous allocation is kept if the allocator fails.
    pub fn reallocate(&mut self, allocator: &dyn StakeAllocator) -> Result<(), StrategyError> {
        let allocation = allocator.allocate(
            &self.combinations,
            self.config.total_budget,
            self.config.risk_preference,
        )?;
        check_allocation(&self.combinations, &allocation, self.config.total_budget)?;

        self.config.allocation_method = allocation.method;
        self.allocation = allocation;
        Ok(())
    }

    /// Legs across all combinations, de-duplicated by name in first-seen order
    pub fn unique_bets(&self) -> Vec<Arc<Bet>> {
        let mut seen = HashSet::new();
        let mut bets = Vec::new();
        for combination in &self.combinations {
            for bet in combination.bets() {
                if seen.insert(bet.name.as_str()) {
                    bets.push(Arc::clone(bet));
                }
            }
        }
        bets
    }

    pub fn summary(&self) -> StrategySummary {
        let mut summary = StrategySummary {
            combination_count: self.combinations.len(),
            funded_count: 0,
            total_budget: self.config.total_budget,
            total_stake: 0.0,
            total_potential_payout: 0.0,
            expected_profit: 0.0,
        };

        for (combination, entry) in self.entries() {
            if entry.stake > 0.0 {
                summary.funded_count += 1;
            }
            summary.total_stake += entry.stake;
            summary.total_potential_payout += potential_payout(combination, entry.stake);
            summary.expected_profit += entry.stake * combination.ev_per_dollar();
        }

        summary
    }

    /// Reason nothing was staked, if so
    pub fn warning(&self) -> Option<String> {
        if self.combinations.is_empty() {
            Some(format!(
                "No suitable combinations for a {} risk preference",
                self.config.risk_preference
            ))
        } else if self.allocation.total_stake() <= 0.0 {
            Some("No combination has a positive edge; nothing was staked".to_string())
        } else {
            None
        }
    }
}

fn check_allocation(
    combinations: &[Combination],
    allocation: &Allocation,
    total_budget: f64,
) -> Result<(), StrategyError> {
    if allocation.len() != combinations.len() {
        return Err(StrategyError::Validation(format!(
            "{} stakes for {} combinations",
            allocation.len(),
            combinations.len()
        )));
    }
    if let Some(bad) = allocation
        .entries
        .iter()
        .find(|e| !e.stake.is_finite() || e.stake < 0.0)
    {
        return Err(StrategyError::Validation(format!(
            "Stake must be a non-negative amount, got {}",
            bad.stake
        )));
    }
    let total = allocation.total_stake();
    if total > total_budget + BUDGET_TOLERANCE * total_budget.max(1.0) {
        return Err(StrategyError::Validation(format!(
            "Total stake {:.2} exceeds budget {:.2}",
            total, total_budget
        )));
    }
    Ok(())
}

/// Runs bets through the combination, ranking and allocation stages
#[derive(Debug, Clone, Default)]
pub struct StrategyEngine {
    config: StrategyConfig,
}

impl StrategyEngine {
    pub fn new(config: StrategyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    /// Process bets with the configured allocation method
    pub fn process(&self, bets: &[Bet]) -> Result<BettingStrategy, StrategyError> {
        let allocator = allocator_for(self.config.allocation_method);
        self.process_with(bets, allocator.as_ref())
    }

    /// Process bets with an explicit allocator
    pub fn process_with(
        &self,
        bets: &[Bet],
        allocator: &dyn StakeAllocator,
    ) -> Result<BettingStrategy, StrategyError> {
        self.config.validate()?;
        for bet in bets {
            bet.validate()?;
        }
        validate_unique_names(bets)?;

        let mut config = self.config.clone();
        config.folds = config.resolve_folds(bets.len())?;
        config.allocation_method = allocator.method();

        let enumerated = config.enumeration_size(bets.len());
        validate_enumeration_size(enumerated, config.max_enumeration)?;

        let ranked = CombinationBuilder::new(config.margin).build_ranked(
            bets,
            config.strategy_type,
            config.folds,
            config.risk_preference,
            config.max_combinations,
        );

        if ranked.is_empty() {
            warn!(
                "No suitable combinations: {} enumerated, none pass the {} filter",
                enumerated, config.risk_preference
            );
            return Ok(BettingStrategy::new(config));
        }

        let allocation =
            allocator.allocate(&ranked, config.total_budget, config.risk_preference)?;

        let strategy = BettingStrategy::from_parts(config, ranked, allocation)?;
        let summary = strategy.summary();
        info!(
            "{} strategy: {} of {} combinations ranked, {} funded, stake {:.2} / {:.2}",
            strategy.strategy_type(),
            summary.combination_count,
            enumerated,
            summary.funded_count,
            summary.total_stake,
            summary.total_budget
        );

        Ok(strategy)
    }
}

/// Process bets with a configuration
pub fn process_strategy(
    bets: &[Bet],
    config: StrategyConfig,
) -> Result<BettingStrategy, StrategyError> {
    StrategyEngine::new(config).process(bets)
}
