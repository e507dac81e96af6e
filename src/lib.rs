//! # PolyGuide - Constraint-Guided GPU Schedule Search
//!
//! Searches loop orders and tile sizes around a polyhedral baseline schedule
//! for the configuration with the best GPU memory behaviour:
//! - Candidate generation from a baseline (neighbors, full enumeration, sampling)
//! - Per-array coalescing analysis and a weighted coalescing score
//! - Shared-memory bank-conflict detection
//! - Hard/soft constraint filtering
//! - Cost estimation with bank-conflict penalties
//!
//! ## Architecture
//!
//! ```text
//! Baseline → Solver (generate) → Legality → Constraint filter → Evaluator → Best config
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use polyguide::prelude::*;
//!
//! let problem = polyguide::frontend::builtin("gemm").unwrap();
//! let mut optimizer = HybridOptimizer::new(TuningConfig::default());
//! optimizer.set_access_patterns(problem.access_patterns.clone());
//! let result = optimizer.optimize(Some(&problem.baseline), "all_legal");
//! println!("{}", result.best_config);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod autotuning;
pub mod evaluator;
pub mod frontend;
pub mod ir;
pub mod solver;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::analysis::{
        check_bank_conflict, check_coalescing_for_pattern, compute_stride_for_pattern,
        compute_weighted_coalescing_score, satisfies_coalescing_constraint, BankConflict,
        SearchSpaceEstimate, SpaceReduction,
    };
    pub use crate::autotuning::{HybridOptimizer, OptimizationResult, Strategy, TuningConfig};
    pub use crate::evaluator::{CostEvaluator, CostModel, EvaluatorConfig, HeuristicCostModel};
    pub use crate::frontend::Problem;
    pub use crate::ir::*;
    pub use crate::solver::{
        is_legal_config, ConstraintMode, ConstraintSolver, FilterOutcome, SolverConfig,
    };
    pub use crate::utils::errors::*;
}

use anyhow::Result;
use std::path::Path;

/// Version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load a problem file and run one search on it.
pub fn optimize_file<P: AsRef<Path>>(
    path: P,
    config: autotuning::TuningConfig,
) -> Result<autotuning::OptimizationResult> {
    config.validate()?;
    let problem = frontend::load(path)?;
    Ok(optimize_problem(&problem, config))
}

/// Run one search with `config.strategy` on an in-memory problem.
pub fn optimize_problem(
    problem: &frontend::Problem,
    config: autotuning::TuningConfig,
) -> autotuning::OptimizationResult {
    let strategy = config.strategy;
    let mut optimizer = autotuning::HybridOptimizer::new(config);
    optimizer.set_access_patterns(problem.access_patterns.clone());
    optimizer.run(Some(&problem.baseline), strategy)
}
