//! Core business logic modules

pub mod allocation;
pub mod combination;
pub mod kelly;
pub mod mean_variance;
pub mod risk;

// Re-export commonly used types
pub use allocation::{allocator_for, AllocatedStake, Allocation, StakeAllocator};
pub use combination::{
    count_combinations, generate_combinations, Combination, CombinationBuilder, DEFAULT_MARGIN,
    MAX_ENUMERATION,
};
pub use kelly::{calculate_kelly_fraction, fractional_kelly, normalize_stakes, KellyAllocator};
pub use mean_variance::MeanVarianceAllocator;
pub use risk::{filter_and_sort, RiskThresholds, TopCombinations, MAX_COMBINATIONS};
