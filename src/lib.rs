//! Betting Strategy - combination builder and stake allocator
//!
//! This library provides:
//! - Accumulator, Parlay and System combination generation
//! - Risk-based filtering and ranking by expected value
//! - Fractional Kelly and mean-variance stake allocation
//! - Bet loading (CSV / JSON), strategy persistence and text reports
//!
//! # Example
//!
//! ```
//! use betting_strategy::models::{Bet, RiskPreference, StrategyType};
//! use betting_strategy::strategy::{process_strategy, StrategyConfig};
//!
//! let bets = vec![
//!     Bet::new("Team A", 2.0, 60.0).unwrap(),
//!     Bet::new("Team B", 1.5, 70.0).unwrap(),
//! ];
//! let config = StrategyConfig::new(100.0, StrategyType::Accumulator, RiskPreference::Moderate);
//! let strategy = process_strategy(&bets, config).unwrap();
//!
//! assert_eq!(strategy.combinations().len(), 1);
//! assert!((strategy.stake_allocation()[0] - 100.0).abs() < 1e-9);
//! ```

pub mod core;
pub mod data;
pub mod error;
pub mod models;
pub mod report;
pub mod strategy;

// Re-export commonly used types
pub use crate::core::{Combination, CombinationBuilder, KellyAllocator, MeanVarianceAllocator, StakeAllocator};
pub use data::{load_bets, load_strategy, save_strategy, PersistedStrategy};
pub use error::StrategyError;
pub use models::{AllocationMethod, Bet, RiskPreference, StrategyRequest, StrategyResponse, StrategyType};
pub use report::{generate_report, write_report};
pub use strategy::{process_strategy, BettingStrategy, StrategyConfig, StrategyEngine, StrategySummary};
