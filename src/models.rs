use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::persistence::PersistedStrategy;
use crate::error::{validate_confidence, validate_name, validate_odds, StrategyError};
use crate::strategy::StrategySummary;

/// A single wager
///
/// `confidence` is the estimated win probability as a percentage (0-100).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub name: String,
    pub odds: f64,
    pub confidence: f64,
}

impl Bet {
    /// Create a validated bet
    pub fn new(name: impl Into<String>, odds: f64, confidence: f64) -> Result<Self, StrategyError> {
        let bet = Self {
            name: name.into(),
            odds,
            confidence,
        };
        bet.validate()?;
        Ok(bet)
    }

    /// Check name, odds and confidence
    pub fn validate(&self) -> Result<(), StrategyError> {
        validate_name(&self.name)?;
        validate_odds(&self.name, self.odds)?;
        validate_confidence(&self.name, self.confidence)?;
        Ok(())
    }

    /// Win probability normalized to 0-1
    pub fn probability(&self) -> f64 {
        self.confidence / 100.0
    }
}

/// How the bets are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum StrategyType {
    /// One combination with every bet
    #[default]
    Accumulator,
    /// Same shape as an accumulator
    Parlay,
    /// Every subset within a size range
    System,
}

impl StrategyType {
    pub const ALL: [StrategyType; 3] = [
        StrategyType::Accumulator,
        StrategyType::Parlay,
        StrategyType::System,
    ];

    /// Parse a strategy name, returning None when unrecognized
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "accumulator" | "acca" => Some(StrategyType::Accumulator),
            "parlay" => Some(StrategyType::Parlay),
            "system" => Some(StrategyType::System),
            _ => None,
        }
    }

    /// Parse a strategy name, falling back to `Accumulator`
    pub fn from_name(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrategyType::Accumulator => "Accumulator",
            StrategyType::Parlay => "Parlay",
            StrategyType::System => "System",
        }
    }

    /// Whether every bet must be a leg of the single combination
    pub fn uses_all_legs(&self) -> bool {
        match self {
            StrategyType::Accumulator | StrategyType::Parlay => true,
            StrategyType::System => false,
        }
    }
}

impl From<String> for StrategyType {
    fn from(s: String) -> Self {
        Self::from_name(&s)
    }
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bettor's appetite for risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum RiskPreference {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskPreference {
    pub const ALL: [RiskPreference; 3] = [
        RiskPreference::Conservative,
        RiskPreference::Moderate,
        RiskPreference::Aggressive,
    ];

    /// Parse a risk preference, returning None when unrecognized
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "conservative" | "low" => Some(RiskPreference::Conservative),
            "moderate" | "medium" => Some(RiskPreference::Moderate),
            "aggressive" | "high" => Some(RiskPreference::Aggressive),
            _ => None,
        }
    }

    /// Parse a risk preference, falling back to `Moderate`
    pub fn from_name(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        match self {
            RiskPreference::Conservative => "Conservative",
            RiskPreference::Moderate => "Moderate",
            RiskPreference::Aggressive => "Aggressive",
        }
    }
}

impl From<String> for RiskPreference {
    fn from(s: String) -> Self {
        Self::from_name(&s)
    }
}

impl fmt::Display for RiskPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stake allocation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum AllocationMethod {
    /// Budget shared in proportion to fractional Kelly values
    #[default]
    Kelly,
    /// Budget shared by a mean-variance portfolio
    MeanVariance,
}

impl AllocationMethod {
    pub const ALL: [AllocationMethod; 2] = [AllocationMethod::Kelly, AllocationMethod::MeanVariance];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "kelly" => Some(AllocationMethod::Kelly),
            "mean_variance" | "mv" | "markowitz" => Some(AllocationMethod::MeanVariance),
            _ => None,
        }
    }

    /// Parse a method name, falling back to `Kelly`
    pub fn from_name(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    pub fn name(&self) -> &'static str {
        match self {
            AllocationMethod::Kelly => "kelly",
            AllocationMethod::MeanVariance => "mean_variance",
        }
    }
}

impl From<String> for AllocationMethod {
    fn from(s: String) -> Self {
        Self::from_name(&s)
    }
}

impl fmt::Display for AllocationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Strategy processing request
#[derive(Debug, Serialize, Deserialize)]
pub struct StrategyRequest {
    pub bets: Vec<Bet>,
    pub total_budget: f64,
    #[serde(default)]
    pub strategy_type: StrategyType,
    #[serde(default)]
    pub folds: Option<usize>,
    #[serde(default)]
    pub risk_preference: RiskPreference,
    #[serde(default)]
    pub allocation_method: AllocationMethod,
}

/// Strategy processing response
#[derive(Debug, Serialize, Deserialize)]
pub struct StrategyResponse {
    pub strategy: PersistedStrategy,
    pub summary: StrategySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
