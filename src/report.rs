//! Plain-text betting report
//!
//! Only combinations with a positive stake are listed.

use std::fs;
use std::path::Path;

use crate::data::persistence::{PersistedCombination, PersistedStrategy};
use crate::error::StrategyError;

fn format_combination(out: &mut String, index: usize, combination: &PersistedCombination) {
    out.push_str(&format!("Combination {}:\n", index));
    out.push_str(&format!("    Combined Odds: {:.2}\n", combination.combined_odds));
    out.push_str(&format!("    Combined Probability: {:.4}\n", combination.combined_prob));
    out.push_str(&format!("    Expected Value per Dollar: {:.2}\n", combination.ev_per_dollar));
    out.push_str(&format!("    Stake Allocation: {:.2}\n", combination.stake_allocation));
    out.push_str(&format!("    Potential Payout: {:.2}\n", combination.potential_payout));
    out.push_str("    Bets:\n");
    for bet in &combination.bets {
        out.push_str(&format!(
            "        - Name: {}, Odds: {}, Confidence: {}%\n",
            bet.name, bet.odds, bet.confidence
        ));
    }
    out.push('\n');
}

/// Render the report text
pub fn generate_report(strategy: &PersistedStrategy) -> String {
    let mut out = String::new();

    out.push_str("Betting Report\n");
    out.push_str("==============\n");
    out.push_str(&format!("Date: {}\n", strategy.date.as_deref().unwrap_or("Unknown")));
    out.push_str(&format!("Total Budget: {}\n", strategy.total_budget));
    out.push_str(&format!("Total Stake: {:.2}\n", strategy.total_stake));
    out.push_str(&format!("Total Potential Payout: {:.2}\n", strategy.total_potential_payout));
    out.push_str(&format!("Strategy Type: {}\n", strategy.strategy_type));
    out.push_str(&format!("Risk Preference: {}\n", strategy.risk_preference));
    out.push_str(&format!("Allocation Method: {}\n", strategy.allocation_method));
    out.push_str("-----------------------------------\n\n");

    let funded: Vec<&PersistedCombination> = strategy
        .combinations
        .iter()
        .filter(|c| c.stake_allocation > 0.0)
        .collect();

    if funded.is_empty() {
        out.push_str("No combinations with stake allocation greater than zero.\n");
    } else {
        for (i, combination) in funded.iter().enumerate() {
            format_combination(&mut out, i + 1, combination);
        }
    }

    out
}

/// Render the report and write it to `path`
pub fn write_report<P: AsRef<Path>>(
    strategy: &PersistedStrategy,
    path: P,
) -> Result<(), StrategyError> {
    fs::write(path, generate_report(strategy))?;
    Ok(())
}
