//! Combination Builder
//!
//! Enumerates the leg sets implied by a strategy type:
//!
//! - Accumulator / Parlay: a single combination holding every bet
//! - System: every subset of size `r` for `r` in `min..=max`, where `min`
//!   depends on the risk preference and `max` defaults to the bet count
//!
//! Subsets of one size follow lexicographic order over the input bets and
//! sizes are concatenated in ascending order. Legs are assumed independent:
//!
//! ```text
//! combined_odds = Π odds
//! combined_prob = Π confidence / 100
//! ev_per_dollar = combined_prob * combined_odds * (1 - margin) - 1
//! ```

use std::sync::Arc;
use tracing::{debug, warn};

use super::risk::TopCombinations;
use crate::models::{Bet, RiskPreference, StrategyType};

/// Bookmaker overround removed from combined odds
pub const DEFAULT_MARGIN: f64 = 0.05;

/// Enumerations larger than this are logged as a warning
const LARGE_ENUMERATION: u128 = 1_000_000;

/// Default cap on the number of System subsets a run may enumerate
pub const MAX_ENUMERATION: u64 = 5_000_000;

/// A set of legs settled as one wager
#[derive(Debug, Clone, PartialEq)]
pub struct Combination {
    bets: Vec<Arc<Bet>>,
    combined_odds: f64,
    combined_prob: f64,
    ev_per_dollar: f64,
    margin: f64,
}

/// `(combined_odds, combined_prob, ev_per_dollar)` over the given legs
pub fn aggregate<'a>(legs: impl Iterator<Item = &'a Bet>, margin: f64) -> (f64, f64, f64) {
    let mut combined_odds = 1.0;
    let mut combined_prob = 1.0;
    for leg in legs {
        combined_odds *= leg.odds;
        combined_prob *= leg.probability();
    }
    let ev_per_dollar = combined_prob * combined_odds * (1.0 - margin) - 1.0;
    (combined_odds, combined_prob, ev_per_dollar)
}

impl Combination {
    /// Build a combination using the default margin
    pub fn new(bets: Vec<Arc<Bet>>) -> Self {
        Self::with_margin(bets, DEFAULT_MARGIN)
    }

    /// Build a combination, computing all aggregate values up front
    pub fn with_margin(bets: Vec<Arc<Bet>>, margin: f64) -> Self {
        debug_assert!(!bets.is_empty(), "a combination needs at least one leg");

        let (combined_odds, combined_prob, ev_per_dollar) =
            aggregate(bets.iter().map(|b| b.as_ref()), margin);

        Self {
            bets,
            combined_odds,
            combined_prob,
            ev_per_dollar,
            margin,
        }
    }

    pub fn bets(&self) -> &[Arc<Bet>] {
        &self.bets
    }

    /// Number of legs
    pub fn folds(&self) -> usize {
        self.bets.len()
    }

    pub fn combined_odds(&self) -> f64 {
        self.combined_odds
    }

    pub fn combined_prob(&self) -> f64 {
        self.combined_prob
    }

    pub fn ev_per_dollar(&self) -> f64 {
        self.ev_per_dollar
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Combined odds after the bookmaker margin
    pub fn adjusted_odds(&self) -> f64 {
        self.combined_odds * (1.0 - self.margin)
    }

    pub fn leg_names(&self) -> Vec<&str> {
        self.bets.iter().map(|b| b.name.as_str()).collect()
    }

    /// Leg names joined for display
    pub fn label(&self) -> String {
        self.leg_names().join(", ")
    }
}

/// Lexicographic r-subsets of `0..n`
struct SubsetIndices {
    n: usize,
    indices: Vec<usize>,
    done: bool,
}

impl SubsetIndices {
    fn new(n: usize, r: usize) -> Self {
        Self {
            n,
            indices: (0..r).collect(),
            done: r == 0 || r > n,
        }
    }
}

impl Iterator for SubsetIndices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let current = self.indices.clone();
        let r = self.indices.len();

        // Rightmost position that can still move right
        let mut i = r;
        while i > 0 && self.indices[i - 1] == self.n - r + i - 1 {
            i -= 1;
        }

        if i == 0 {
            self.done = true;
        } else {
            self.indices[i - 1] += 1;
            for j in i..r {
                self.indices[j] = self.indices[j - 1] + 1;
            }
        }

        Some(current)
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Binomial coefficient C(n, k), saturating at `u128::MAX`
pub fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k) as u128;
    let n = n as u128;
    let mut result: u128 = 1;
    for i in 0..k {
        // result * (n - i) / (i + 1) is exact; cancel the common factor first
        let g = gcd(result, i + 1);
        let factor = (n - i) / ((i + 1) / g);
        result = match (result / g).checked_mul(factor) {
            Some(next) => next,
            None => return u128::MAX,
        };
    }
    result
}

/// Number of subsets with sizes in `min_size..=max_size`, saturating
pub fn count_combinations(n: usize, min_size: usize, max_size: usize) -> u128 {
    if min_size > max_size {
        return 0;
    }
    (min_size..=max_size).fold(0u128, |total, r| total.saturating_add(binomial(n, r)))
}

/// Enumerates combinations for a strategy
#[derive(Debug, Clone)]
pub struct CombinationBuilder {
    margin: f64,
}

impl CombinationBuilder {
    pub fn new(margin: f64) -> Self {
        Self { margin }
    }

    /// Build every combination implied by the strategy type
    ///
    /// `folds` is ignored for Accumulator / Parlay (all legs are always used).
    /// For System it caps the subset size and defaults to the bet count.
    pub fn build(
        &self,
        bets: &[Bet],
        strategy_type: StrategyType,
        folds: Option<usize>,
        risk_preference: RiskPreference,
    ) -> Vec<Combination> {
        if bets.is_empty() {
            return Vec::new();
        }

        let shared: Vec<Arc<Bet>> = bets.iter().cloned().map(Arc::new).collect();

        let combinations = if strategy_type.uses_all_legs() {
            if let Some(f) = folds.filter(|&f| f != shared.len()) {
                debug!(
                    "{} uses every leg: folds {} coerced to {}",
                    strategy_type,
                    f,
                    shared.len()
                );
            }
            vec![Combination::with_margin(shared, self.margin)]
        } else {
            let max_size = folds.unwrap_or(shared.len()).min(shared.len());
            self.system(&shared, risk_preference.min_system_size(), max_size)
        };

        debug!(
            "Built {} {} combinations from {} bets",
            combinations.len(),
            strategy_type,
            bets.len()
        );

        combinations
    }

    /// Every subset with size in `min_size..=max_size`, ascending by size
    pub fn system(
        &self,
        bets: &[Arc<Bet>],
        min_size: usize,
        max_size: usize,
    ) -> Vec<Combination> {
        let min_size = min_size.max(1);
        let max_size = max_size.min(bets.len());

        let expected = count_combinations(bets.len(), min_size, max_size);
        if expected > LARGE_ENUMERATION {
            warn!(
                "System bet over {} legs expands to {} combinations",
                bets.len(),
                expected
            );
        }

        let mut combinations = Vec::with_capacity(expected.min(LARGE_ENUMERATION) as usize);
        for r in min_size..=max_size {
            for indices in SubsetIndices::new(bets.len(), r) {
                let legs = indices.iter().map(|&i| Arc::clone(&bets[i])).collect();
                combinations.push(Combination::with_margin(legs, self.margin));
            }
        }

        combinations
    }

    /// Build, filter and rank in one pass, keeping at most `limit`
    ///
    /// Subsets are scored from their legs before anything is allocated; only
    /// those that pass the risk filter and reach the current top `limit` are
    /// materialized. The result equals filtering and ranking the output of
    /// [`build`](Self::build).
    pub fn build_ranked(
        &self,
        bets: &[Bet],
        strategy_type: StrategyType,
        folds: Option<usize>,
        risk_preference: RiskPreference,
        limit: usize,
    ) -> Vec<Combination> {
        let mut top = TopCombinations::new(risk_preference, limit);
        if bets.is_empty() {
            return top.into_ranked();
        }

        let shared: Vec<Arc<Bet>> = bets.iter().cloned().map(Arc::new).collect();

        if strategy_type.uses_all_legs() {
            let combination = Combination::with_margin(shared, self.margin);
            top.offer(
                combination.combined_odds(),
                combination.ev_per_dollar(),
                || combination,
            );
        } else {
            let n = shared.len();
            let min_size = risk_preference.min_system_size().max(1);
            let max_size = folds.unwrap_or(n).min(n);

            for r in min_size..=max_size {
                for indices in SubsetIndices::new(n, r) {
                    let (odds, _, ev) =
                        aggregate(indices.iter().map(|&i| shared[i].as_ref()), self.margin);
                    top.offer(odds, ev, || {
                        let legs = indices.iter().map(|&i| Arc::clone(&shared[i])).collect();
                        Combination::with_margin(legs, self.margin)
                    });
                }
            }
        }

        debug!(
            "Ranked {} {} combinations from {} bets: {} accepted, {} kept",
            top.offered(),
            strategy_type,
            bets.len(),
            top.accepted(),
            top.len()
        );

        top.into_ranked()
    }
}

impl Default for CombinationBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MARGIN)
    }
}

/// Build combinations with the default margin
pub fn generate_combinations(
    bets: &[Bet],
    strategy_type: StrategyType,
    folds: Option<usize>,
    risk_preference: RiskPreference,
) -> Vec<Combination> {
    CombinationBuilder::default().build(bets, strategy_type, folds, risk_preference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::risk::{filter_and_sort_with_limit, MAX_COMBINATIONS};

    fn bet(name: &str, odds: f64, confidence: f64) -> Bet {
        Bet::new(name, odds, confidence).unwrap()
    }

    fn two_bets() -> Vec<Bet> {
        vec![bet("A", 2.0, 60.0), bet("B", 1.5, 70.0)]
    }

    fn bets(n: usize) -> Vec<Bet> {
        (0..n)
            .map(|i| bet(&format!("B{}", i), 1.5 + i as f64 * 0.1, 60.0))
            .collect()
    }

    #[test]
    fn test_accumulator_single_combination() {
        let combos = generate_combinations(
            &two_bets(),
            StrategyType::Accumulator,
            None,
            RiskPreference::Moderate,
        );

        assert_eq!(combos.len(), 1);
        let c = &combos[0];
        assert_eq!(c.leg_names(), vec!["A", "B"]);
        assert!((c.combined_odds() - 3.0).abs() < 1e-9);
        assert!((c.combined_prob() - 0.42).abs() < 1e-9);
        assert!((c.ev_per_dollar() - 0.197).abs() < 1e-9);
    }

    #[test]
    fn test_parlay_coerces_folds() {
        let combos = generate_combinations(
            &bets(4),
            StrategyType::Parlay,
            Some(2),
            RiskPreference::Conservative,
        );
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].folds(), 4);
    }

    #[test]
    fn test_system_moderate_matches_accumulator() {
        let system = generate_combinations(
            &two_bets(),
            StrategyType::System,
            Some(2),
            RiskPreference::Moderate,
        );
        let acca = generate_combinations(
            &two_bets(),
            StrategyType::Accumulator,
            None,
            RiskPreference::Moderate,
        );
        assert_eq!(system, acca);
    }

    #[test]
    fn test_system_conservative_three_bets() {
        let combos = generate_combinations(
            &bets(3),
            StrategyType::System,
            None,
            RiskPreference::Conservative,
        );
        assert_eq!(combos.len(), 7);

        let labels: Vec<String> = combos.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            vec![
                "B0", "B1", "B2", "B0, B1", "B0, B2", "B1, B2", "B0, B1, B2"
            ]
        );
    }

    #[test]
    fn test_system_counts_match_binomial_sum() {
        for n in 1..=8 {
            for risk in RiskPreference::ALL {
                let combos =
                    generate_combinations(&bets(n), StrategyType::System, None, risk);
                let expected = count_combinations(n, risk.min_system_size(), n);
                assert_eq!(combos.len() as u128, expected, "n={} risk={}", n, risk);
            }
        }
    }

    #[test]
    fn test_system_max_size_caps_enumeration() {
        let combos = generate_combinations(
            &bets(5),
            StrategyType::System,
            Some(3),
            RiskPreference::Moderate,
        );
        // C(5,2) + C(5,3)
        assert_eq!(combos.len(), 20);
        assert!(combos.iter().all(|c| (2..=3).contains(&c.folds())));
        assert!(combos.windows(2).all(|w| w[0].folds() <= w[1].folds()));
    }

    #[test]
    fn test_system_aggressive_with_too_few_bets() {
        let combos = generate_combinations(
            &two_bets(),
            StrategyType::System,
            None,
            RiskPreference::Aggressive,
        );
        assert!(combos.is_empty());
    }

    #[test]
    fn test_empty_bets() {
        for kind in StrategyType::ALL {
            assert!(generate_combinations(&[], kind, None, RiskPreference::Moderate).is_empty());
        }
    }

    #[test]
    fn test_products_and_bounds() {
        let combos = generate_combinations(
            &bets(5),
            StrategyType::System,
            None,
            RiskPreference::Conservative,
        );
        for c in &combos {
            let odds: f64 = c.bets().iter().map(|b| b.odds).product();
            let prob: f64 = c.bets().iter().map(|b| b.confidence / 100.0).product();
            assert!((c.combined_odds() - odds).abs() < 1e-9);
            assert!((c.combined_prob() - prob).abs() < 1e-9);
            assert!((0.0..=1.0).contains(&c.combined_prob()));

            let max_leg = c.bets().iter().map(|b| b.odds).fold(f64::MIN, f64::max);
            assert!(c.combined_odds() >= max_leg);
        }
    }

    #[test]
    fn test_legs_are_shared() {
        let combos = generate_combinations(
            &bets(3),
            StrategyType::System,
            None,
            RiskPreference::Conservative,
        );
        // B0 appears alone and in the full accumulator
        assert!(Arc::ptr_eq(&combos[0].bets()[0], &combos[6].bets()[0]));
    }

    #[test]
    fn test_custom_margin() {
        let builder = CombinationBuilder::new(0.0);
        let combos = builder.build(
            &two_bets(),
            StrategyType::Accumulator,
            None,
            RiskPreference::Moderate,
        );
        assert!((combos[0].ev_per_dollar() - 0.26).abs() < 1e-9);
        assert!((combos[0].adjusted_odds() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(5, 0), 1);
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(10, 5), 252);
        assert_eq!(binomial(3, 4), 0);
        assert_eq!(count_combinations(3, 1, 3), 7);
        assert_eq!(count_combinations(3, 3, 2), 0);
    }

    #[test]
    fn test_subset_indices_order() {
        let subsets: Vec<Vec<usize>> = SubsetIndices::new(4, 2).collect();
        assert_eq!(
            subsets,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3]
            ]
        );
        assert_eq!(SubsetIndices::new(3, 0).count(), 0);
        assert_eq!(SubsetIndices::new(2, 3).count(), 0);
    }

    #[test]
    fn test_binomial_large_inputs_do_not_overflow() {
        assert_eq!(binomial(60, 30), 118_264_581_564_861_424);
        assert_eq!(
            binomial(130, 65),
            95_067_625_827_960_698_145_584_333_020_095_113_100
        );
        assert_eq!(binomial(200, 100), u128::MAX);
        assert_eq!(count_combinations(200, 1, 200), u128::MAX);
        assert_eq!(count_combinations(20, 1, 20), (1 << 20) - 1);
    }

    #[test]
    fn test_build_ranked_matches_build_then_filter() {
        let bets: Vec<Bet> = [(2.1, 55.0), (1.8, 62.0), (1.6, 68.0), (1.9, 57.0), (3.4, 25.0), (2.1, 55.0)]
            .iter()
            .enumerate()
            .map(|(i, (o, c))| bet(&format!("L{}", i), *o, *c))
            .collect();
        let builder = CombinationBuilder::default();

        for kind in StrategyType::ALL {
            for risk in RiskPreference::ALL {
                for folds in [None, Some(3)] {
                    for limit in [1, 5, MAX_COMBINATIONS] {
                        let expected = filter_and_sort_with_limit(
                            builder.build(&bets, kind, folds, risk),
                            risk,
                            limit,
                        );
                        let ranked = builder.build_ranked(&bets, kind, folds, risk, limit);
                        assert_eq!(ranked, expected, "{} {} {:?} {}", kind, risk, folds, limit);
                    }
                }
            }
        }
    }

    #[test]
    fn test_build_ranked_keeps_at_most_limit() {
        // 2^16 - 1 subsets, most of them acceptable
        let bets: Vec<Bet> = (0..16).map(|i| bet(&format!("B{}", i), 1.3, 90.0)).collect();
        let ranked = CombinationBuilder::default().build_ranked(
            &bets,
            StrategyType::System,
            None,
            RiskPreference::Aggressive,
            50,
        );

        assert_eq!(ranked.len(), 50);
        assert!(ranked
            .windows(2)
            .all(|w| w[0].ev_per_dollar() >= w[1].ev_per_dollar()));
    }

    #[test]
    fn test_build_ranked_nothing_accepted() {
        let bets: Vec<Bet> = (0..16).map(|i| bet(&format!("B{}", i), 1.9, 55.0)).collect();
        let ranked = CombinationBuilder::default().build_ranked(
            &bets,
            StrategyType::System,
            None,
            RiskPreference::Conservative,
            MAX_COMBINATIONS,
        );
        assert!(ranked.is_empty());
    }
}
