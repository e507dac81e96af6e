//! Hybrid optimizer
//!
//! Runs one search per call: the solver generates candidates from the
//! baseline, illegal and hard-constraint-violating candidates are set
//! aside, and the evaluator picks the cheapest survivor.
//!
//! ```text
//! Generate(strategy) -> Legality -> Constraint filter -> Evaluate -> Select
//! ```
//!
//! # Example
//!
//! ```ignore
//! use polyguide::autotuning::{HybridOptimizer, TuningConfig};
//!
//! let mut optimizer = HybridOptimizer::new(TuningConfig::default());
//! optimizer.set_access_patterns(patterns);
//! let result = optimizer.optimize(Some(&baseline), "all_legal");
//! println!("{}", result);
//! ```

mod config;
mod results;

pub use config::TuningConfig;
pub use results::OptimizationResult;

use crate::evaluator::CostEvaluator;
use crate::ir::{AccessPattern, BaselineSchedule, ScheduleConfig};
use crate::solver::{partition_legal, ConstraintSolver, FilterOutcome};
use crate::utils::errors::SearchError;
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Candidate generation strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Baseline plus uniform tile variants
    #[default]
    OptimalNeighbors,
    /// Full enumeration of loop orders and tile menus
    AllLegal,
    /// Baseline plus sampled tile variants
    Sampling,
}

impl Strategy {
    /// All strategies in declaration order.
    pub const ALL: [Strategy; 3] = [
        Strategy::OptimalNeighbors,
        Strategy::AllLegal,
        Strategy::Sampling,
    ];

    /// Name accepted by [`HybridOptimizer::optimize`].
    pub fn name(self) -> &'static str {
        match self {
            Strategy::OptimalNeighbors => "optimal_neighbors",
            Strategy::AllLegal => "all_legal",
            Strategy::Sampling => "sampling",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Strategy {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| SearchError::UnknownStrategy(s.to_string()))
    }
}

/// Orchestrates solver and evaluator
#[derive(Debug)]
pub struct HybridOptimizer {
    config: TuningConfig,
    solver: ConstraintSolver,
    evaluator: CostEvaluator,
}

impl Default for HybridOptimizer {
    fn default() -> Self {
        Self::new(TuningConfig::default())
    }
}

impl HybridOptimizer {
    /// Create an optimizer with the heuristic cost model
    pub fn new(config: TuningConfig) -> Self {
        let evaluator = CostEvaluator::new(config.evaluator.clone());
        Self::with_evaluator(config, evaluator)
    }

    /// Create an optimizer with a prepared evaluator
    pub fn with_evaluator(config: TuningConfig, evaluator: CostEvaluator) -> Self {
        let solver = ConstraintSolver::new(config.solver.clone());
        Self {
            config,
            solver,
            evaluator,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &TuningConfig {
        &self.config
    }

    /// The constraint solver
    pub fn solver(&self) -> &ConstraintSolver {
        &self.solver
    }

    /// Mutable access to the solver, e.g. to change constraint modes
    pub fn solver_mut(&mut self) -> &mut ConstraintSolver {
        &mut self.solver
    }

    /// The cost evaluator
    pub fn evaluator(&self) -> &CostEvaluator {
        &self.evaluator
    }

    /// Mutable access to the evaluator, e.g. to change the penalty
    pub fn evaluator_mut(&mut self) -> &mut CostEvaluator {
        &mut self.evaluator
    }

    /// Register the access patterns used for scoring
    pub fn set_access_patterns(&mut self, patterns: Vec<AccessPattern>) {
        self.solver.set_access_patterns(patterns);
    }

    /// Run the strategy named `strategy`.
    ///
    /// Unknown names fall back to `optimal_neighbors`.
    pub fn optimize(
        &self,
        baseline: Option<&BaselineSchedule>,
        strategy: &str,
    ) -> OptimizationResult {
        let strategy = strategy.parse::<Strategy>().unwrap_or_else(|e| {
            warn!("{}, falling back to {}", e, Strategy::OptimalNeighbors);
            Strategy::OptimalNeighbors
        });
        self.run(baseline, strategy)
    }

    /// Run `strategy` with the configured candidate counts.
    ///
    /// A missing baseline yields an empty result.
    pub fn run(
        &self,
        baseline: Option<&BaselineSchedule>,
        strategy: Strategy,
    ) -> OptimizationResult {
        let baseline = match baseline {
            Some(baseline) => baseline,
            None => {
                warn!("no baseline schedule given, returning an empty result");
                return OptimizationResult::empty(strategy);
            }
        };
        info!("running {} search", strategy);
        match strategy {
            Strategy::OptimalNeighbors => {
                self.optimize_with_neighbors(baseline, self.config.num_neighbors)
            }
            Strategy::AllLegal => {
                let names = baseline.iterator_names();
                self.optimize_with_all_legal(names.len(), &names)
            }
            Strategy::Sampling => self.optimize_with_sampling(baseline, self.config.num_samples),
        }
    }

    /// Search the baseline and up to `k - 1` uniform tile variants
    pub fn optimize_with_neighbors(
        &self,
        baseline: &BaselineSchedule,
        k: usize,
    ) -> OptimizationResult {
        let start = Instant::now();
        let candidates = self.solver.generate_candidates_from_optimal(baseline, k);
        self.select(Strategy::OptimalNeighbors, candidates, start)
    }

    /// Search every loop order crossed with the enumeration tile menu
    pub fn optimize_with_all_legal<S: AsRef<str>>(
        &self,
        num_loops: usize,
        loop_names: &[S],
    ) -> OptimizationResult {
        let start = Instant::now();
        let candidates = self.solver.generate_all_legal_configs(
            num_loops,
            loop_names,
            self.config.only_coalesced,
        );
        let names: Vec<&str> = loop_names.iter().take(num_loops).map(|s| s.as_ref()).collect();
        let mut result = self.select(Strategy::AllLegal, candidates, start);
        if names.len() == num_loops {
            result.search_space = Some(self.solver.search_space_reduction(&names));
        }
        result
    }

    /// Search the baseline and up to `n - 1` sampled tile variants
    pub fn optimize_with_sampling(
        &self,
        baseline: &BaselineSchedule,
        n: usize,
    ) -> OptimizationResult {
        let start = Instant::now();
        let candidates = self.solver.generate_by_constraint_sampling(baseline, n);
        self.select(Strategy::Sampling, candidates, start)
    }

    fn select(
        &self,
        strategy: Strategy,
        candidates: Vec<ScheduleConfig>,
        start: Instant,
    ) -> OptimizationResult {
        let num_generated = candidates.len();
        let (legal, mut illegal) = partition_legal(candidates);
        if !illegal.is_empty() {
            info!("{} illegal candidate(s) set aside", illegal.len());
        }
        let num_legal = legal.len();

        let FilterOutcome { kept, mut removed } = self.solver.filter_by_constraints(legal);
        let num_constraint_filtered = removed.len();

        let mut evaluated = kept;
        let best_config = self.evaluator.search_best_config(&mut evaluated);
        let num_evaluated = evaluated.len();

        let successes: Vec<&ScheduleConfig> =
            evaluated.iter().filter(|c| c.execution_time_ms > 0.0).collect();
        let num_succeeded = successes.len();
        let (worst_time_ms, average_time_ms) = if successes.is_empty() {
            (0.0, 0.0)
        } else {
            let sum: f64 = successes.iter().map(|c| c.execution_time_ms).sum();
            let worst = successes
                .iter()
                .map(|c| c.execution_time_ms)
                .fold(0.0, f64::max);
            (worst, sum / num_succeeded as f64)
        };
        let best_scoring_config = successes
            .iter()
            .fold(None, |best: Option<&ScheduleConfig>, &c| match best {
                Some(b) if b.weighted_coalescing_score >= c.weighted_coalescing_score => Some(b),
                _ => Some(c),
            })
            .cloned();

        for rejected in removed.iter_mut().chain(illegal.iter_mut()) {
            rejected.is_valid = false;
        }
        let mut all_candidates = evaluated;
        all_candidates.append(&mut removed);
        all_candidates.append(&mut illegal);

        let result = OptimizationResult {
            strategy,
            best_time_ms: best_config.execution_time_ms,
            best_config,
            best_scoring_config,
            all_candidates,
            num_generated,
            num_legal,
            num_constraint_filtered,
            num_evaluated,
            num_succeeded,
            total_search_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            worst_time_ms,
            average_time_ms,
            search_space: None,
        };
        info!(
            "{}: {} generated, {} legal, {} filtered, {} evaluated, best {:.3} ms in {:.2} ms",
            strategy,
            result.num_generated,
            result.num_legal,
            result.num_constraint_filtered,
            result.num_evaluated,
            result.best_time_ms,
            result.total_search_time_ms
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::ConstraintMode;

    fn gemm_optimizer(config: TuningConfig) -> HybridOptimizer {
        let mut optimizer = HybridOptimizer::new(config);
        optimizer.set_access_patterns(vec![
            AccessPattern::read_only("A", &["i", "k"]),
            AccessPattern::read_only("B", &["k", "j"]),
            AccessPattern::read_write("C", &["i", "j"]),
        ]);
        optimizer
    }

    #[test]
    fn test_strategy_names() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>().unwrap(), strategy);
        }
        assert!(matches!(
            "genetic".parse::<Strategy>(),
            Err(SearchError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_unknown_strategy_falls_back() {
        let optimizer = gemm_optimizer(TuningConfig::default());
        let baseline = BaselineSchedule::single(&["i", "j", "k"]);
        let result = optimizer.optimize(Some(&baseline), "genetic");
        assert_eq!(result.strategy, Strategy::OptimalNeighbors);
        assert_eq!(result.num_generated, 6);
    }

    #[test]
    fn test_missing_baseline() {
        let optimizer = gemm_optimizer(TuningConfig::default());
        for strategy in Strategy::ALL {
            let result = optimizer.run(None, strategy);
            assert_eq!(result.num_generated, 0);
            assert!(result.all_candidates.is_empty());
            assert_eq!(result.best_time_ms, -1.0);
        }
    }

    #[test]
    fn test_neighbor_statistics() {
        let optimizer = gemm_optimizer(TuningConfig::default());
        let baseline = BaselineSchedule::single(&["i", "j", "k"]);
        let result = optimizer.optimize_with_neighbors(&baseline, 4);

        assert_eq!(result.num_generated, 4);
        assert_eq!(result.num_legal, 4);
        assert_eq!(result.num_evaluated, 4);
        assert_eq!(result.num_succeeded, 4);
        assert!(result.succeeded());
        assert!(result.best_time_ms <= result.average_time_ms);
        assert!(result.average_time_ms <= result.worst_time_ms);
        assert!(result
            .all_candidates
            .iter()
            .all(|c| c.execution_time_ms >= result.best_time_ms));
    }

    #[test]
    fn test_hard_bank_conflicts_are_counted() {
        let config = TuningConfig::thorough().bank_conflict_mode(ConstraintMode::Hard);
        let optimizer = gemm_optimizer(config);
        let baseline = BaselineSchedule::single(&["i", "j", "k"]);
        let result = optimizer.optimize_with_neighbors(&baseline, 9);

        assert_eq!(result.num_generated, 9);
        assert_eq!(result.num_constraint_filtered + result.num_evaluated, result.num_legal);
        // 8, 16 and 48 conflict.
        assert_eq!(result.num_constraint_filtered, 3);
        assert!(!result.best_config.has_bank_conflict);
        assert_eq!(result.all_candidates.len(), 9);
    }

    #[test]
    fn test_all_legal_prefers_ikj_by_score() {
        let optimizer = gemm_optimizer(TuningConfig::quick());
        let result = optimizer.optimize_with_all_legal(3, &["i", "j", "k"]);

        assert_eq!(result.num_generated, 4 * 8);
        let scoring = result.best_scoring_config.as_ref().unwrap();
        assert_eq!(scoring.loop_order(), vec!["i", "k", "j"]);
        assert_eq!(scoring.weighted_coalescing_score, 16384.0);

        let space = result.search_space.unwrap();
        assert_eq!(space.original.total, 6 * 8);
        assert_eq!(space.retained_configs, 4 * 8);
    }
}
