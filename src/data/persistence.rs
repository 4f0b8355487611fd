//! Strategy JSON persistence
//!
//! The stored record keeps every leg of every combination plus the derived
//! values. On load the derived values are recomputed from the legs and must
//! match what was stored.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::core::allocation::{AllocatedStake, Allocation};
use crate::core::combination::{Combination, DEFAULT_MARGIN, MAX_ENUMERATION};
use crate::core::risk::MAX_COMBINATIONS;
use crate::error::{validate_budget, StrategyError};
use crate::models::{AllocationMethod, Bet, RiskPreference, StrategyType};
use crate::strategy::{potential_payout, BettingStrategy, StrategyConfig};

/// Allowed drift between stored and recomputed combination values
pub const ROUND_TRIP_TOLERANCE: f64 = 1e-6;

fn default_margin() -> f64 {
    DEFAULT_MARGIN
}

/// Stored combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedCombination {
    pub bets: Vec<Bet>,
    pub combined_odds: f64,
    pub combined_prob: f64,
    pub ev_per_dollar: f64,
    pub stake_allocation: f64,
    #[serde(default)]
    pub potential_payout: f64,
}

/// Stored strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedStrategy {
    pub total_budget: f64,
    pub strategy_type: StrategyType,
    #[serde(default)]
    pub risk_preference: RiskPreference,
    #[serde(default)]
    pub folds: Option<usize>,
    #[serde(default = "default_margin")]
    pub margin: f64,
    #[serde(default)]
    pub allocation_method: AllocationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub total_stake: f64,
    #[serde(default)]
    pub total_potential_payout: f64,
    pub combinations: Vec<PersistedCombination>,
}

impl PersistedStrategy {
    /// Snapshot a strategy, stamped with the current local time
    pub fn from_strategy(strategy: &BettingStrategy) -> Self {
        let combinations = strategy
            .entries()
            .map(|(c, entry)| PersistedCombination {
                bets: c.bets().iter().map(|b| (**b).clone()).collect(),
                combined_odds: c.combined_odds(),
                combined_prob: c.combined_prob(),
                ev_per_dollar: c.ev_per_dollar(),
                stake_allocation: entry.stake,
                potential_payout: potential_payout(c, entry.stake),
            })
            .collect();

        let summary = strategy.summary();
        let config = &strategy.config;

        Self {
            total_budget: config.total_budget,
            strategy_type: config.strategy_type,
            risk_preference: config.risk_preference,
            folds: config.folds,
            margin: config.margin,
            allocation_method: strategy.allocation().method,
            date: Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string()),
            total_stake: summary.total_stake,
            total_potential_payout: summary.total_potential_payout,
            combinations,
        }
    }

    /// Rebuild the strategy, recomputing every combination from its legs
    pub fn into_strategy(self) -> Result<BettingStrategy, StrategyError> {
        validate_budget(self.total_budget)?;

        let config = StrategyConfig {
            total_budget: self.total_budget,
            strategy_type: self.strategy_type,
            folds: self.folds,
            risk_preference: self.risk_preference,
            allocation_method: self.allocation_method,
            margin: self.margin,
            max_combinations: MAX_COMBINATIONS.max(self.combinations.len()),
            max_enumeration: MAX_ENUMERATION,
        };
        config.validate()?;

        // Legs with the same name are shared and must agree
        let mut legs: HashMap<String, Arc<Bet>> = HashMap::new();
        let mut combinations = Vec::with_capacity(self.combinations.len());
        let mut entries = Vec::with_capacity(self.combinations.len());

        for (index, stored) in self.combinations.into_iter().enumerate() {
            if stored.bets.is_empty() {
                return Err(StrategyError::Validation(format!(
                    "Combination {} has no legs",
                    index + 1
                )));
            }

            let mut shared = Vec::with_capacity(stored.bets.len());
            for bet in stored.bets {
                bet.validate()?;
                let leg = match legs.get(&bet.name) {
                    Some(existing) if **existing == bet => Arc::clone(existing),
                    Some(_) => {
                        return Err(StrategyError::Validation(format!(
                            "Bet '{}' is stored with conflicting odds or confidence",
                            bet.name
                        )))
                    }
                    None => {
                        let leg = Arc::new(bet);
                        legs.insert(leg.name.clone(), Arc::clone(&leg));
                        leg
                    }
                };
                shared.push(leg);
            }

            let combination = Combination::with_margin(shared, config.margin);
            check_recomputed(index, "combined_odds", stored.combined_odds, combination.combined_odds())?;
            check_recomputed(index, "combined_prob", stored.combined_prob, combination.combined_prob())?;
            check_recomputed(index, "ev_per_dollar", stored.ev_per_dollar, combination.ev_per_dollar())?;

            entries.push(AllocatedStake {
                adjusted_odds: combination.adjusted_odds(),
                weight: stored.stake_allocation / config.total_budget,
                stake: stored.stake_allocation,
            });
            combinations.push(combination);
        }

        let allocation = Allocation {
            method: config.allocation_method,
            entries,
        };

        debug!(
            "Reconstructed {} combinations over {} distinct bets",
            combinations.len(),
            legs.len()
        );

        BettingStrategy::from_parts(config, combinations, allocation)
    }
}

fn check_recomputed(
    index: usize,
    field: &str,
    stored: f64,
    recomputed: f64,
) -> Result<(), StrategyError> {
    if (stored - recomputed).abs() > ROUND_TRIP_TOLERANCE {
        return Err(StrategyError::Validation(format!(
            "Combination {}: stored {} {} does not match recomputed {}",
            index + 1,
            field,
            stored,
            recomputed
        )));
    }
    Ok(())
}

/// Save a strategy as pretty-printed JSON
pub fn save_strategy<P: AsRef<Path>>(
    strategy: &BettingStrategy,
    path: P,
) -> Result<(), StrategyError> {
    let persisted = PersistedStrategy::from_strategy(strategy);
    let content = serde_json::to_string_pretty(&persisted)?;
    fs::write(path.as_ref(), content)?;
    debug!("Saved strategy to {:?}", path.as_ref());
    Ok(())
}

/// Read the stored record without rebuilding the strategy
pub fn load_persisted<P: AsRef<Path>>(path: P) -> Result<PersistedStrategy, StrategyError> {
    let content = fs::read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&content)?)
}

/// Load and rebuild a strategy
pub fn load_strategy<P: AsRef<Path>>(path: P) -> Result<BettingStrategy, StrategyError> {
    load_persisted(path)?.into_strategy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::process_strategy;
    use tempfile::tempdir;

    fn bet(name: &str, odds: f64, confidence: f64) -> Bet {
        Bet::new(name, odds, confidence).unwrap()
    }

    fn system_strategy() -> BettingStrategy {
        let bets = vec![
            bet("Home", 2.1, 55.0),
            bet("Over 2.5", 1.8, 62.0),
            bet("Away +1", 1.6, 68.0),
        ];
        let config = StrategyConfig::new(100.0, StrategyType::System, RiskPreference::Conservative);
        process_strategy(&bets, config).unwrap()
    }

    #[test]
    fn test_round_trip_in_memory() {
        let strategy = system_strategy();
        let restored = PersistedStrategy::from_strategy(&strategy)
            .into_strategy()
            .unwrap();

        assert_eq!(restored.config, strategy.config);
        assert_eq!(restored.combinations().len(), strategy.combinations().len());
        for (a, b) in restored.combinations().iter().zip(strategy.combinations()) {
            assert_eq!(a.leg_names(), b.leg_names());
            assert!((a.combined_odds() - b.combined_odds()).abs() < 1e-6);
            assert!((a.combined_prob() - b.combined_prob()).abs() < 1e-6);
            assert!((a.ev_per_dollar() - b.ev_per_dollar()).abs() < 1e-6);
        }
        assert_eq!(restored.stake_allocation(), strategy.stake_allocation());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("strategy.json");

        let strategy = system_strategy();
        save_strategy(&strategy, &path).unwrap();
        let loaded = load_strategy(&path).unwrap();

        for (a, b) in loaded.stake_allocation().iter().zip(strategy.stake_allocation()) {
            assert!((a - b).abs() < 1e-9);
        }
        let (loaded_summary, summary) = (loaded.summary(), strategy.summary());
        assert_eq!(loaded_summary.combination_count, summary.combination_count);
        assert!((loaded_summary.total_potential_payout - summary.total_potential_payout).abs() < 1e-6);
        assert_eq!(loaded.unique_bets().len(), 3);

        let persisted = load_persisted(&path).unwrap();
        assert!(persisted.date.is_some());
        assert!((persisted.total_stake - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_loaded_legs_are_shared() {
        let restored = PersistedStrategy::from_strategy(&system_strategy())
            .into_strategy()
            .unwrap();
        let home: Vec<&Arc<Bet>> = restored
            .combinations()
            .iter()
            .flat_map(|c| c.bets())
            .filter(|b| b.name == "Home")
            .collect();
        assert!(home.len() > 1);
        assert!(home.windows(2).all(|w| Arc::ptr_eq(w[0], w[1])));
    }

    #[test]
    fn test_minimal_record_uses_defaults() {
        let json = r#"{
            "total_budget": 50,
            "strategy_type": "Accumulator",
            "folds": 2,
            "combinations": [{
                "bets": [
                    {"name": "A", "odds": 2.0, "confidence": 60},
                    {"name": "B", "odds": 1.5, "confidence": 70}
                ],
                "combined_odds": 3.0,
                "combined_prob": 0.42,
                "ev_per_dollar": 0.197,
                "stake_allocation": 50.0
            }]
        }"#;
        let persisted: PersistedStrategy = serde_json::from_str(json).unwrap();
        assert_eq!(persisted.risk_preference, RiskPreference::Moderate);
        assert_eq!(persisted.allocation_method, AllocationMethod::Kelly);
        assert!((persisted.margin - 0.05).abs() < 1e-12);

        let strategy = persisted.into_strategy().unwrap();
        assert_eq!(strategy.stake_allocation(), vec![50.0]);
        assert!((strategy.allocation().entries[0].weight - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tampered_values_rejected() {
        let mut persisted = PersistedStrategy::from_strategy(&system_strategy());
        persisted.combinations[0].combined_odds += 0.01;
        let err = persisted.into_strategy().unwrap_err();
        assert!(err.to_string().contains("combined_odds"));
    }

    #[test]
    fn test_conflicting_leg_definitions_rejected() {
        let mut persisted = PersistedStrategy::from_strategy(&system_strategy());
        let last = persisted.combinations.len() - 1;
        persisted.combinations[last].bets[0].confidence = 10.0;
        assert!(persisted.into_strategy().is_err());
    }

    #[test]
    fn test_over_budget_rejected() {
        let mut persisted = PersistedStrategy::from_strategy(&system_strategy());
        persisted.combinations[0].stake_allocation += 500.0;
        assert!(persisted.into_strategy().is_err());
    }

    #[test]
    fn test_empty_legs_rejected() {
        let mut persisted = PersistedStrategy::from_strategy(&system_strategy());
        persisted.combinations[0].bets.clear();
        assert!(persisted.into_strategy().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = load_strategy(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, StrategyError::Io(_)));
    }

    #[test]
    fn test_load_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_strategy(&path), Err(StrategyError::Json(_))));
    }
}
