//! Bet list loading from CSV and JSON
//!
//! CSV files need a header row with `name`, `odds` and `confidence` columns.
//! JSON files hold either a bare array of bets or an object with a `bets`
//! array (the shape of a strategy request).

use polars::prelude::*;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::StrategyError;
use crate::models::Bet;

#[derive(Deserialize)]
#[serde(untagged)]
enum BetsFile {
    List(Vec<Bet>),
    Wrapped { bets: Vec<Bet> },
}

/// Load bets from a CSV file
pub fn load_bets_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Bet>, StrategyError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
        .finish()?;

    // Whole-number odds or confidences are inferred as integers
    let odds = df.column("odds")?.cast(&DataType::Float64)?;
    let confidence = df.column("confidence")?.cast(&DataType::Float64)?;
    let names = df.column("name")?.cast(&DataType::String)?;

    let odds_col = odds.f64()?;
    let confidence_col = confidence.f64()?;
    let name_col = names.str()?;

    let mut bets = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let row = i + 2;
        let (Some(name), Some(odds), Some(confidence)) =
            (name_col.get(i), odds_col.get(i), confidence_col.get(i))
        else {
            return Err(StrategyError::Validation(format!(
                "Row {}: name, odds and confidence are all required",
                row
            )));
        };

        let bet = Bet::new(name.trim(), odds, confidence)
            .map_err(|e| StrategyError::Validation(format!("Row {}: {}", row, e)))?;
        bets.push(bet);
    }

    debug!("Loaded {} bets from {:?}", bets.len(), path.as_ref());
    Ok(bets)
}

/// Load bets from a JSON file
pub fn load_bets_json<P: AsRef<Path>>(path: P) -> Result<Vec<Bet>, StrategyError> {
    let content = fs::read_to_string(path.as_ref())?;
    let bets = match serde_json::from_str::<BetsFile>(&content)? {
        BetsFile::List(bets) => bets,
        BetsFile::Wrapped { bets } => bets,
    };

    for bet in &bets {
        bet.validate()?;
    }

    debug!("Loaded {} bets from {:?}", bets.len(), path.as_ref());
    Ok(bets)
}

/// Load bets, choosing the format from the file extension
pub fn load_bets<P: AsRef<Path>>(path: P) -> Result<Vec<Bet>, StrategyError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => load_bets_csv(path),
        Some("json") => load_bets_json(path),
        _ => Err(StrategyError::Validation(format!(
            "Unsupported bets file {:?} (expected .csv or .json)",
            path
        ))),
    }
}
