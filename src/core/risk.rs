//! Risk Filter / Ranker
//!
//! | Preference   | min EV | max combined odds | min system size |
//! |--------------|--------|-------------------|-----------------|
//! | Conservative | 0.05   | 5                 | 1               |
//! | Moderate     | 0.00   | 15                | 2               |
//! | Aggressive   | -0.05  | unbounded         | 3               |

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

use super::combination::Combination;
use crate::models::RiskPreference;

/// Maximum number of combinations passed to the allocator
pub const MAX_COMBINATIONS: usize = 500;

/// Filter thresholds for a risk preference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskThresholds {
    pub min_ev: f64,
    pub max_combined_odds: Option<f64>,
}

impl RiskThresholds {
    pub fn accepts(&self, combination: &Combination) -> bool {
        self.accepts_values(combination.combined_odds(), combination.ev_per_dollar())
    }

    pub fn accepts_values(&self, combined_odds: f64, ev_per_dollar: f64) -> bool {
        ev_per_dollar >= self.min_ev
            && self
                .max_combined_odds
                .map_or(true, |max| combined_odds <= max)
    }
}

impl RiskPreference {
    pub fn thresholds(&self) -> RiskThresholds {
        match self {
            RiskPreference::Conservative => RiskThresholds {
                min_ev: 0.05,
                max_combined_odds: Some(5.0),
            },
            RiskPreference::Moderate => RiskThresholds {
                min_ev: 0.0,
                max_combined_odds: Some(15.0),
            },
            RiskPreference::Aggressive => RiskThresholds {
                min_ev: -0.05,
                max_combined_odds: None,
            },
        }
    }

    /// Smallest subset size enumerated for System bets
    pub fn min_system_size(&self) -> usize {
        match self {
            RiskPreference::Conservative => 1,
            RiskPreference::Moderate => 2,
            RiskPreference::Aggressive => 3,
        }
    }
}

/// Keep acceptable combinations, best EV first, capped at `limit`
///
/// Sorting is stable so equal EVs keep their enumeration order.
pub fn filter_and_sort_with_limit(
    combinations: Vec<Combination>,
    risk_preference: RiskPreference,
    limit: usize,
) -> Vec<Combination> {
    let thresholds = risk_preference.thresholds();
    let total = combinations.len();

    let mut kept: Vec<Combination> = combinations
        .into_iter()
        .filter(|c| thresholds.accepts(c))
        .collect();

    kept.sort_by(|a, b| {
        b.ev_per_dollar()
            .partial_cmp(&a.ev_per_dollar())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    kept.truncate(limit);

    debug!(
        "Risk filter ({}): kept {} of {} combinations",
        risk_preference,
        kept.len(),
        total
    );

    kept
}

/// Keep acceptable combinations, best EV first, capped at [`MAX_COMBINATIONS`]
pub fn filter_and_sort(
    combinations: Vec<Combination>,
    risk_preference: RiskPreference,
) -> Vec<Combination> {
    filter_and_sort_with_limit(combinations, risk_preference, MAX_COMBINATIONS)
}

/// Heap entry; the greatest entry is the worst ranked one
struct Ranked {
    ev: f64,
    index: usize,
    combination: Combination,
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lower EV ranks worse; on equal EV the later candidate ranks worse
        other
            .ev
            .total_cmp(&self.ev)
            .then(self.index.cmp(&other.index))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Streaming filter and ranker holding at most `limit` combinations
///
/// Candidates are offered in enumeration order. The kept set and its order
/// match [`filter_and_sort_with_limit`] over the same sequence.
pub struct TopCombinations {
    thresholds: RiskThresholds,
    limit: usize,
    heap: BinaryHeap<Ranked>,
    offered: usize,
    accepted: usize,
}

impl TopCombinations {
    pub fn new(risk_preference: RiskPreference, limit: usize) -> Self {
        Self {
            thresholds: risk_preference.thresholds(),
            limit,
            heap: BinaryHeap::with_capacity(limit.saturating_add(1).min(4096)),
            offered: 0,
            accepted: 0,
        }
    }

    /// Offer a candidate by its aggregate values
    ///
    /// `build` runs only when the candidate passes the filter and enters the
    /// current top `limit`.
    pub fn offer<F>(&mut self, combined_odds: f64, ev_per_dollar: f64, build: F)
    where
        F: FnOnce() -> Combination,
    {
        let index = self.offered;
        self.offered += 1;

        if !self.thresholds.accepts_values(combined_odds, ev_per_dollar) {
            return;
        }
        self.accepted += 1;

        if self.limit == 0 {
            return;
        }
        if self.heap.len() == self.limit {
            match self.heap.peek() {
                Some(worst) if ev_per_dollar.total_cmp(&worst.ev) != Ordering::Greater => return,
                _ => {}
            }
        }

        self.heap.push(Ranked {
            ev: ev_per_dollar,
            index,
            combination: build(),
        });
        if self.heap.len() > self.limit {
            self.heap.pop();
        }
    }

    pub fn offered(&self) -> usize {
        self.offered
    }

    /// Candidates that passed the risk filter
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Kept combinations, best EV first
    pub fn into_ranked(self) -> Vec<Combination> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|r| r.combination)
            .collect()
    }
}
