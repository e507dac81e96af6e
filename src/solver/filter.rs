//! Constraint filtering and structural legality.

use super::ConstraintSolver;
use crate::ir::ScheduleConfig;
use log::{debug, info};

/// Smallest legal tile extent.
pub const MIN_TILE_SIZE: i64 = 1;
/// Largest legal tile extent.
pub const MAX_TILE_SIZE: i64 = 1024;

/// Candidates split by the constraint filter.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Survivors in input order
    pub kept: Vec<ScheduleConfig>,
    /// Candidates breaking a hard constraint, in input order
    pub removed: Vec<ScheduleConfig>,
}

impl FilterOutcome {
    /// Number of candidates that entered the filter.
    pub fn input_len(&self) -> usize {
        self.kept.len() + self.removed.len()
    }
}

impl ConstraintSolver {
    /// Re-annotate every candidate and drop those breaking a hard rule.
    ///
    /// Soft, penalty-based and unconstrained modes never drop anything;
    /// they only leave the annotations for the evaluator.
    pub fn filter_by_constraints(&self, candidates: Vec<ScheduleConfig>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        for mut candidate in candidates {
            self.annotate(&mut candidate);
            if self.violates_hard_constraints(&candidate) {
                debug!(
                    "rejected {} (coalescing violation: {}, bank conflict: {}-way)",
                    candidate.describe(),
                    candidate.has_coalescing_violation,
                    candidate.bank_conflict_way
                );
                outcome.removed.push(candidate);
            } else {
                outcome.kept.push(candidate);
            }
        }
        info!(
            "constraint filter: {} in, {} removed, {} remaining (coalescing: {}, bank conflicts: {})",
            outcome.input_len(),
            outcome.removed.len(),
            outcome.kept.len(),
            self.config.coalescing_mode,
            self.config.bank_conflict_mode
        );
        outcome
    }
}

/// Structural legality: at least one transformation and every tile extent,
/// in the tile table or inside a transformation, within
/// [`MIN_TILE_SIZE`]..=[`MAX_TILE_SIZE`].
pub fn is_legal_config(config: &ScheduleConfig) -> bool {
    if config.transformations.is_empty() {
        return false;
    }
    let in_range = |s: &i64| (MIN_TILE_SIZE..=MAX_TILE_SIZE).contains(s);
    config.tile_sizes.iter().all(|ts| in_range(&ts.size))
        && config
            .transformations
            .iter()
            .all(|t| t.tile_sizes.iter().all(&in_range))
}

/// Split candidates into legal and illegal ones, both in input order.
pub fn partition_legal(
    candidates: Vec<ScheduleConfig>,
) -> (Vec<ScheduleConfig>, Vec<ScheduleConfig>) {
    candidates.into_iter().partition(is_legal_config)
}
