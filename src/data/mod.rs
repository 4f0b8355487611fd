//! Bet input loading and strategy persistence

pub mod bets_loader;
pub mod persistence;

// Re-export commonly used types
pub use bets_loader::{load_bets, load_bets_csv, load_bets_json};
pub use persistence::{
    load_persisted, load_strategy, save_strategy, PersistedCombination, PersistedStrategy,
};
