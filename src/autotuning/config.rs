//! Optimizer configuration

use super::Strategy;
use crate::evaluator::EvaluatorConfig;
use crate::solver::{ConstraintMode, SolverConfig};
use crate::utils::errors::SearchResult;

/// Configuration for the hybrid optimizer
#[derive(Clone, Debug, PartialEq)]
pub struct TuningConfig {
    /// Candidate generation and constraint modes
    pub solver: SolverConfig,

    /// Cost evaluation
    pub evaluator: EvaluatorConfig,

    /// Candidates requested from the neighbor generator
    pub num_neighbors: usize,

    /// Candidates requested from the sampling generator
    pub num_samples: usize,

    /// Skip zero-score loop orders in the full enumeration
    pub only_coalesced: bool,

    /// Strategy used by [`HybridOptimizer::run`](super::HybridOptimizer::run)
    pub strategy: Strategy,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            solver: SolverConfig::default(),
            evaluator: EvaluatorConfig::default(),
            num_neighbors: 10,
            num_samples: 5,
            only_coalesced: true,
            strategy: Strategy::OptimalNeighbors,
        }
    }
}

impl TuningConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the strategy
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the neighbor count
    pub fn neighbors(mut self, k: usize) -> Self {
        self.num_neighbors = k;
        self
    }

    /// Set the sample count
    pub fn samples(mut self, n: usize) -> Self {
        self.num_samples = n;
        self
    }

    /// Set the coalescing mode
    pub fn coalescing_mode(mut self, mode: ConstraintMode) -> Self {
        self.solver.coalescing_mode = mode;
        self
    }

    /// Set the bank-conflict mode
    pub fn bank_conflict_mode(mut self, mode: ConstraintMode) -> Self {
        self.solver.bank_conflict_mode = mode;
        self
    }

    /// Enable/disable the bank-conflict penalty and set its factor
    pub fn bank_conflict_penalty(mut self, enabled: bool, factor: f64) -> Self {
        self.evaluator = self.evaluator.penalty(enabled, factor);
        self
    }

    /// Set the evaluator seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.evaluator.seed = seed;
        self
    }

    /// Keep or prune zero-score loop orders in the full enumeration
    pub fn only_coalesced(mut self, only: bool) -> Self {
        self.only_coalesced = only;
        self
    }

    /// Quick preset (few candidates, small menus)
    pub fn quick() -> Self {
        Self {
            solver: SolverConfig {
                neighbor_tile_sizes: vec![32, 64],
                sampling_tile_sizes: vec![32, 64],
                enumeration_tile_sizes: vec![32, 64],
                ..SolverConfig::default()
            },
            num_neighbors: 3,
            num_samples: 3,
            ..Default::default()
        }
    }

    /// Thorough preset (wider menus, odd sizes included to exercise penalties)
    pub fn thorough() -> Self {
        Self {
            solver: SolverConfig {
                neighbor_tile_sizes: vec![8, 16, 32, 48, 64, 96, 128, 256],
                sampling_tile_sizes: vec![8, 16, 24, 32, 48, 64, 96, 128],
                enumeration_tile_sizes: vec![8, 16, 32, 64, 128, 256],
                ..SolverConfig::default()
            },
            num_neighbors: 9,
            num_samples: 9,
            only_coalesced: false,
            ..Default::default()
        }
    }

    /// Check solver and evaluator settings.
    pub fn validate(&self) -> SearchResult<()> {
        self.solver.validate()?;
        self.evaluator.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TuningConfig::default();
        assert_eq!(config.num_neighbors, 10);
        assert_eq!(config.num_samples, 5);
        assert_eq!(config.solver.coalescing_mode, ConstraintMode::Hard);
        assert_eq!(config.solver.bank_conflict_mode, ConstraintMode::Soft);
        assert!(config.evaluator.enable_bank_conflict_penalty);
        assert_eq!(config.evaluator.penalty_factor, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        assert!(TuningConfig::quick().validate().is_ok());
        assert!(TuningConfig::thorough().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = TuningConfig::new()
            .strategy(Strategy::Sampling)
            .samples(3)
            .bank_conflict_mode(ConstraintMode::Hard)
            .bank_conflict_penalty(false, 4.0)
            .seed(7);
        assert_eq!(config.strategy, Strategy::Sampling);
        assert_eq!(config.num_samples, 3);
        assert!(config.solver.bank_conflict_mode.rejects());
        assert!(!config.evaluator.enable_bank_conflict_penalty);
        assert_eq!(config.evaluator.seed, 7);

        let bad = TuningConfig::new().bank_conflict_penalty(true, -1.0);
        assert!(bad.validate().is_err());
    }
}
