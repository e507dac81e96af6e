//! Search-space accounting.
//!
//! An unconstrained tuner explores every loop order crossed with every
//! tile size per dimension, `n! · t^n` configurations. Pruning loop orders
//! whose weighted coalescing score is zero shrinks that space by whole
//! `t^n` blocks; [`SpaceReduction`] records how much.

use super::coalescing::compute_weighted_coalescing_score;
use crate::ir::{AccessPattern, ScheduleConfig};
use serde::Serialize;

/// Size of the unconstrained search space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchSpaceEstimate {
    /// `n!`
    pub loop_orders: u64,
    /// `t^n`
    pub tile_combinations: u64,
    /// `n! · t^n`
    pub total: u64,
}

impl SearchSpaceEstimate {
    /// Estimate for `loops` loops with `tile_options` sizes per dimension.
    pub fn new(loops: usize, tile_options: usize) -> Self {
        let loop_orders = factorial(loops as u64);
        let tile_combinations =
            (0..loops).fold(1u64, |acc, _| acc.saturating_mul(tile_options as u64));
        Self {
            loop_orders,
            tile_combinations,
            total: loop_orders.saturating_mul(tile_combinations),
        }
    }
}

/// How much of the space survives coalescing pruning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpaceReduction {
    /// The unconstrained space
    pub original: SearchSpaceEstimate,
    /// Loop orders with a positive score
    pub retained_orders: u64,
    /// Configurations kept after pruning
    pub retained_configs: u64,
}

impl SpaceReduction {
    /// Reduction for `retained_orders` surviving orders, each keeping its
    /// full block of tile combinations.
    pub fn from_retained_orders(original: SearchSpaceEstimate, retained_orders: u64) -> Self {
        Self {
            original,
            retained_orders,
            retained_configs: retained_orders.saturating_mul(original.tile_combinations),
        }
    }

    /// Percentage of the original space pruned away.
    pub fn reduction_percent(&self) -> f64 {
        if self.original.total == 0 {
            return 0.0;
        }
        let pruned = self.original.total.saturating_sub(self.retained_configs);
        100.0 * pruned as f64 / self.original.total as f64
    }
}

fn factorial(n: u64) -> u64 {
    (1..=n).fold(1u64, |acc, k| acc.saturating_mul(k))
}

/// Lazy iterator over the orderings of a set of loop names.
///
/// Orders come in lexicographic order of the name positions. Only the
/// current index permutation is held, so a consumer that stops early pays
/// for the orders it took and nothing more.
#[derive(Debug, Clone)]
pub struct LoopOrders {
    names: Vec<String>,
    perm: Vec<usize>,
    done: bool,
}

impl LoopOrders {
    /// Start at the declaration order of `names`.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            names: names.iter().map(|s| s.as_ref().to_string()).collect(),
            perm: (0..names.len()).collect(),
            done: false,
        }
    }
}

impl Iterator for LoopOrders {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Vec<String>> {
        if self.done {
            return None;
        }
        let order = self.perm.iter().map(|&i| self.names[i].clone()).collect();
        self.done = !next_permutation(&mut self.perm);
        Some(order)
    }
}

/// All orderings of `names` in lexicographic order of their positions.
pub fn loop_orders<S: AsRef<str>>(names: &[S]) -> LoopOrders {
    LoopOrders::new(names)
}

/// Advance `perm` to the next lexicographic permutation.
///
/// Returns `false` (leaving `perm` unchanged) when it already is the last one.
pub fn next_permutation(perm: &mut [usize]) -> bool {
    if perm.len() < 2 {
        return false;
    }
    let mut i = perm.len() - 1;
    while i > 0 && perm[i - 1] >= perm[i] {
        i -= 1;
    }
    if i == 0 {
        return false;
    }
    let mut j = perm.len() - 1;
    while perm[j] <= perm[i - 1] {
        j -= 1;
    }
    perm.swap(i - 1, j);
    perm[i..].reverse();
    true
}

/// A loop order with its weighted coalescing score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredOrder {
    /// Loop names, outermost first
    pub order: Vec<String>,
    /// Weighted coalescing score
    pub score: f64,
}

/// Score every loop order of `names` against `patterns`.
///
/// Collects all `n!` orders; use [`count_retained_orders`] when only the
/// number of surviving orders is needed.
pub fn score_loop_orders<S: AsRef<str>>(
    names: &[S],
    patterns: &[AccessPattern],
) -> Vec<ScoredOrder> {
    loop_orders(names)
        .map(|order| {
            let config = ScheduleConfig::from_loop_order(&order);
            let score = compute_weighted_coalescing_score(&config, patterns);
            ScoredOrder { order, score }
        })
        .collect()
}

/// Number of loop orders of `names` with a positive weighted score.
///
/// The score depends on the innermost loop only, so every name that scores
/// when placed innermost accounts for `(n-1)!` orders.
pub fn count_retained_orders<S: AsRef<str>>(names: &[S], patterns: &[AccessPattern]) -> u64 {
    if names.is_empty() {
        return 0;
    }
    let per_innermost = factorial(names.len() as u64 - 1);
    names
        .iter()
        .filter(|name| {
            let innermost: &str = (*name).as_ref();
            let config = ScheduleConfig::from_loop_order(&[innermost]);
            compute_weighted_coalescing_score(&config, patterns) > 0.0
        })
        .fold(0u64, |acc, _| acc.saturating_add(per_innermost))
}

/// The highest-scoring order, first one on ties.
pub fn best_order(scored: &[ScoredOrder]) -> Option<&ScoredOrder> {
    scored.iter().fold(None, |best: Option<&ScoredOrder>, s| match best {
        Some(b) if b.score >= s.score => Some(b),
        _ => Some(s),
    })
}
