use std::collections::HashSet;
use thiserror::Error;

use crate::models::Bet;

/// Strategy engine errors
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Invalid bet or configuration data
    #[error("Validation error: {0}")]
    Validation(String),
    /// Mean-variance solver did not converge
    #[error("Optimization error: {0}")]
    Optimization(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] polars::prelude::PolarsError),
}

impl StrategyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        StrategyError::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, StrategyError::Validation(_))
    }
}

#[cfg(feature = "api")]
mod response {
    use actix_web::{http::StatusCode, HttpResponse, ResponseError};

    use super::StrategyError;
    use crate::models::ErrorResponse;

    impl ResponseError for StrategyError {
        fn status_code(&self) -> StatusCode {
            match self {
                StrategyError::Validation(_) => StatusCode::BAD_REQUEST,
                StrategyError::Optimization(_) => StatusCode::UNPROCESSABLE_ENTITY,
                StrategyError::Io(_) | StrategyError::Json(_) | StrategyError::Csv(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }

        fn error_response(&self) -> HttpResponse {
            let error_code = match self {
                StrategyError::Validation(_) => "validation_error",
                StrategyError::Optimization(_) => "optimization_error",
                StrategyError::Io(_) | StrategyError::Json(_) | StrategyError::Csv(_) => {
                    "internal_error"
                }
            };

            HttpResponse::build(self.status_code()).json(ErrorResponse {
                error: error_code.to_string(),
                message: self.to_string(),
            })
        }
    }
}

/// Validation functions
pub fn validate_name(name: &str) -> Result<(), StrategyError> {
    if name.trim().is_empty() {
        return Err(StrategyError::validation("Bet name cannot be empty"));
    }
    Ok(())
}

pub fn validate_odds(name: &str, odds: f64) -> Result<(), StrategyError> {
    if !odds.is_finite() || odds <= 1.0 {
        return Err(StrategyError::Validation(format!(
            "Bet '{}': odds must be greater than 1.0, got {}",
            name, odds
        )));
    }
    Ok(())
}

pub fn validate_confidence(name: &str, confidence: f64) -> Result<(), StrategyError> {
    if !(0.0..=100.0).contains(&confidence) {
        return Err(StrategyError::Validation(format!(
            "Bet '{}': confidence must be between 0 and 100, got {}",
            name, confidence
        )));
    }
    Ok(())
}

pub fn validate_budget(budget: f64) -> Result<(), StrategyError> {
    if !budget.is_finite() || budget <= 0.0 {
        return Err(StrategyError::Validation(format!(
            "Total budget must be greater than zero, got {}",
            budget
        )));
    }
    Ok(())
}

/// Folds must be positive and cannot exceed the number of bets
pub fn validate_folds(folds: usize, bet_count: usize) -> Result<(), StrategyError> {
    if folds == 0 {
        return Err(StrategyError::validation(
            "Number of folds must be greater than zero",
        ));
    }
    if folds > bet_count {
        return Err(StrategyError::Validation(format!(
            "Number of folds ({}) cannot exceed the number of bets ({})",
            folds, bet_count
        )));
    }
    Ok(())
}

/// System enumerations above `limit` subsets are refused
pub fn validate_enumeration_size(count: u128, limit: u64) -> Result<(), StrategyError> {
    if count > u128::from(limit) {
        return Err(StrategyError::Validation(format!(
            "System bet expands to {} combinations, more than the limit of {}",
            count, limit
        )));
    }
    Ok(())
}

/// Bet names are the identity of a leg and must not repeat
pub fn validate_unique_names(bets: &[Bet]) -> Result<(), StrategyError> {
    let mut seen = HashSet::with_capacity(bets.len());
    for bet in bets {
        if !seen.insert(bet.name.as_str()) {
            return Err(StrategyError::Validation(format!(
                "Duplicate bet name '{}'",
                bet.name
            )));
        }
    }
    Ok(())
}
