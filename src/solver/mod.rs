//! Constraint solver: candidate generation and constraint filtering.
//!
//! The solver owns the constraint modes and the registered access
//! patterns. Generators ([`generate`]) turn a baseline schedule into
//! annotated candidates; the filter ([`filter`]) drops candidates that break
//! a hard constraint and leaves the rest for the evaluator.
//!
//! # Example
//!
//! ```ignore
//! use polyguide::prelude::*;
//!
//! let mut solver = ConstraintSolver::new(SolverConfig::default());
//! solver.set_access_patterns(patterns);
//! let candidates = solver.generate_candidates_from_optimal(&baseline, 5);
//! let outcome = solver.filter_by_constraints(candidates);
//! ```

pub mod filter;
pub mod generate;

pub use filter::{is_legal_config, partition_legal, FilterOutcome, MAX_TILE_SIZE, MIN_TILE_SIZE};

use crate::analysis::{
    check_bank_conflict, coalescing_status, compute_weighted_coalescing_score,
    count_retained_orders, satisfies_coalescing_constraint, SearchSpaceEstimate, SpaceReduction,
};
use crate::ir::{AccessPattern, ScheduleConfig};
use crate::utils::errors::{SearchError, SearchResult};
use std::fmt;
use std::str::FromStr;

/// How a constraint category is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConstraintMode {
    /// Violating candidates are rejected
    #[default]
    Hard,
    /// Violations are recorded only
    Soft,
    /// Violations are recorded and priced by the evaluator
    PenaltyBased,
    /// The category is ignored
    Unconstrained,
}

impl ConstraintMode {
    /// Whether violations remove candidates.
    pub fn rejects(self) -> bool {
        self == ConstraintMode::Hard
    }
}

impl fmt::Display for ConstraintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintMode::Hard => write!(f, "hard"),
            ConstraintMode::Soft => write!(f, "soft"),
            ConstraintMode::PenaltyBased => write!(f, "penalty"),
            ConstraintMode::Unconstrained => write!(f, "none"),
        }
    }
}

impl FromStr for ConstraintMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hard" => Ok(ConstraintMode::Hard),
            "soft" => Ok(ConstraintMode::Soft),
            "penalty" | "penalty_based" | "penalty-based" => Ok(ConstraintMode::PenaltyBased),
            "none" | "unconstrained" => Ok(ConstraintMode::Unconstrained),
            _ => Err(SearchError::UnknownMode(s.to_string())),
        }
    }
}

/// Default upper bound on configurations produced by full enumeration.
pub const DEFAULT_MAX_ENUMERATED: usize = 100_000;

/// Solver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Enforcement of the coalescing constraint
    pub coalescing_mode: ConstraintMode,
    /// Enforcement of the bank-conflict constraint
    pub bank_conflict_mode: ConstraintMode,
    /// Uniform tile sizes tried around the baseline, in order
    pub neighbor_tile_sizes: Vec<i64>,
    /// Uniform tile sizes drawn by constraint sampling, in order
    pub sampling_tile_sizes: Vec<i64>,
    /// Per-dimension tile menu of the full enumeration
    pub enumeration_tile_sizes: Vec<i64>,
    /// Cap on enumerated configurations
    pub max_enumerated: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            coalescing_mode: ConstraintMode::Hard,
            bank_conflict_mode: ConstraintMode::Soft,
            neighbor_tile_sizes: vec![16, 32, 64, 128, 256],
            sampling_tile_sizes: vec![16, 32, 64, 128],
            enumeration_tile_sizes: vec![16, 32, 64, 128, 256],
            max_enumerated: DEFAULT_MAX_ENUMERATED,
        }
    }
}

impl SolverConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the coalescing mode
    pub fn coalescing(mut self, mode: ConstraintMode) -> Self {
        self.coalescing_mode = mode;
        self
    }

    /// Set the bank-conflict mode
    pub fn bank_conflicts(mut self, mode: ConstraintMode) -> Self {
        self.bank_conflict_mode = mode;
        self
    }

    /// Set the enumeration tile menu
    pub fn enumeration_tiles(mut self, sizes: Vec<i64>) -> Self {
        self.enumeration_tile_sizes = sizes;
        self
    }

    /// Set the enumeration cap
    pub fn max_enumerated(mut self, cap: usize) -> Self {
        self.max_enumerated = cap;
        self
    }

    /// Check menus and limits.
    pub fn validate(&self) -> SearchResult<()> {
        let menus = [
            ("neighbor", &self.neighbor_tile_sizes),
            ("sampling", &self.sampling_tile_sizes),
            ("enumeration", &self.enumeration_tile_sizes),
        ];
        for (name, menu) in menus {
            if menu.is_empty() {
                return Err(SearchError::invalid_config(format!("{} tile menu is empty", name)));
            }
            if let Some(bad) = menu.iter().find(|&&s| !(MIN_TILE_SIZE..=MAX_TILE_SIZE).contains(&s)) {
                return Err(SearchError::invalid_config(format!(
                    "{} tile size {} outside [{}, {}]",
                    name, bad, MIN_TILE_SIZE, MAX_TILE_SIZE
                )));
            }
        }
        if self.max_enumerated == 0 {
            return Err(SearchError::invalid_config("enumeration cap must be positive"));
        }
        Ok(())
    }
}

/// Candidate generator and constraint filter.
#[derive(Debug, Clone, Default)]
pub struct ConstraintSolver {
    config: SolverConfig,
    access_patterns: Vec<AccessPattern>,
}

impl ConstraintSolver {
    /// Create a solver without access patterns.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            access_patterns: Vec::new(),
        }
    }

    /// Current settings.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Change the coalescing enforcement.
    pub fn set_coalescing_mode(&mut self, mode: ConstraintMode) {
        self.config.coalescing_mode = mode;
    }

    /// Change the bank-conflict enforcement.
    pub fn set_bank_conflict_mode(&mut self, mode: ConstraintMode) {
        self.config.bank_conflict_mode = mode;
    }

    /// Coalescing enforcement.
    pub fn coalescing_mode(&self) -> ConstraintMode {
        self.config.coalescing_mode
    }

    /// Bank-conflict enforcement.
    pub fn bank_conflict_mode(&self) -> ConstraintMode {
        self.config.bank_conflict_mode
    }

    /// Register the access patterns used for scoring.
    ///
    /// Patterns that are not [analyzable](AccessPattern::is_analyzable) are
    /// dropped.
    pub fn set_access_patterns(&mut self, patterns: Vec<AccessPattern>) {
        let before = patterns.len();
        self.access_patterns = patterns.into_iter().filter(|p| p.is_analyzable()).collect();
        if self.access_patterns.len() < before {
            log::warn!(
                "ignoring {} access pattern(s) without subscripts or with extent < 2",
                before - self.access_patterns.len()
            );
        }
    }

    /// Registered access patterns.
    pub fn access_patterns(&self) -> &[AccessPattern] {
        &self.access_patterns
    }

    /// Weighted coalescing score of `config` against the registered patterns.
    pub fn weighted_coalescing_score(&self, config: &ScheduleConfig) -> f64 {
        compute_weighted_coalescing_score(config, &self.access_patterns)
    }

    /// Recompute every constraint annotation of `config`.
    pub fn annotate(&self, config: &mut ScheduleConfig) {
        let conflict = check_bank_conflict(config);
        config.has_coalescing_violation = !satisfies_coalescing_constraint(config);
        config.has_bank_conflict = conflict.is_conflict();
        config.bank_conflict_way = conflict.way;
        config.weighted_coalescing_score = self.weighted_coalescing_score(config);
        config.array_coalescing_status = coalescing_status(config, &self.access_patterns);
    }

    /// Whether `config` breaks a constraint whose mode is hard.
    ///
    /// Uses the annotations, so call [`annotate`](Self::annotate) first.
    pub fn violates_hard_constraints(&self, config: &ScheduleConfig) -> bool {
        (self.config.coalescing_mode.rejects() && config.has_coalescing_violation)
            || (self.config.bank_conflict_mode.rejects() && config.has_bank_conflict)
    }

    /// Size of the unconstrained space over `loop_names` and how much of it
    /// survives pruning of zero-score loop orders.
    pub fn search_space_reduction<S: AsRef<str>>(&self, loop_names: &[S]) -> SpaceReduction {
        let original =
            SearchSpaceEstimate::new(loop_names.len(), self.config.enumeration_tile_sizes.len());
        let retained = count_retained_orders(loop_names, &self.access_patterns);
        SpaceReduction::from_retained_orders(original, retained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gemm_solver() -> ConstraintSolver {
        let mut solver = ConstraintSolver::new(SolverConfig::default());
        solver.set_access_patterns(vec![
            AccessPattern::read_only("A", &["i", "k"]),
            AccessPattern::read_only("B", &["k", "j"]),
            AccessPattern::read_write("C", &["i", "j"]),
        ]);
        solver
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("hard".parse::<ConstraintMode>().unwrap(), ConstraintMode::Hard);
        assert_eq!("Soft".parse::<ConstraintMode>().unwrap(), ConstraintMode::Soft);
        assert_eq!(
            "penalty".parse::<ConstraintMode>().unwrap(),
            ConstraintMode::PenaltyBased
        );
        assert_eq!(
            "none".parse::<ConstraintMode>().unwrap(),
            ConstraintMode::Unconstrained
        );
        assert!(matches!(
            "strict".parse::<ConstraintMode>(),
            Err(SearchError::UnknownMode(_))
        ));
        for mode in [
            ConstraintMode::Hard,
            ConstraintMode::Soft,
            ConstraintMode::PenaltyBased,
            ConstraintMode::Unconstrained,
        ] {
            assert_eq!(mode.to_string().parse::<ConstraintMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_default_modes() {
        let solver = ConstraintSolver::default();
        assert_eq!(solver.coalescing_mode(), ConstraintMode::Hard);
        assert_eq!(solver.bank_conflict_mode(), ConstraintMode::Soft);
    }

    #[test]
    fn test_config_validation() {
        assert!(SolverConfig::default().validate().is_ok());
        assert!(SolverConfig::default().enumeration_tiles(vec![]).validate().is_err());
        assert!(SolverConfig::default()
            .enumeration_tiles(vec![32, 2048])
            .validate()
            .is_err());
        assert!(SolverConfig::default().max_enumerated(0).validate().is_err());
    }

    #[test]
    fn test_annotate() {
        let solver = gemm_solver();
        let mut config = ScheduleConfig::from_loop_order(&["i", "k", "j"]);
        config.set_tile_size("i", 48);
        solver.annotate(&mut config);

        assert!(!config.has_coalescing_violation);
        assert!(config.has_bank_conflict);
        assert_eq!(config.bank_conflict_way, 16);
        assert_eq!(config.weighted_coalescing_score, 16384.0);
        assert_eq!(config.array_coalescing_status.get("A"), Some(&false));
    }

    #[test]
    fn test_hard_violation_depends_on_mode() {
        let mut solver = gemm_solver();
        let mut config = ScheduleConfig::from_loop_order(&["i", "j"]);
        config.set_tile_size("i", 33);
        solver.annotate(&mut config);
        assert!(!solver.violates_hard_constraints(&config));

        solver.set_bank_conflict_mode(ConstraintMode::Hard);
        assert!(solver.violates_hard_constraints(&config));
    }

    #[test]
    fn test_unanalyzable_patterns_dropped() {
        let mut solver = ConstraintSolver::default();
        solver.set_access_patterns(vec![
            AccessPattern::new::<&str>("s", &[]),
            AccessPattern::new("A", &["i"]),
            AccessPattern::new("U", &["i", "k"]).dimension_size(1),
        ]);
        assert_eq!(solver.access_patterns().len(), 1);
        assert_eq!(solver.access_patterns()[0].array_name, "A");
    }

    #[test]
    fn test_space_reduction() {
        let reduction = gemm_solver().search_space_reduction(&["i", "j", "k"]);
        assert_eq!(reduction.original.total, 750);
        assert_eq!(reduction.retained_orders, 4);
    }

    #[test]
    fn test_space_reduction_wide_nest() {
        let names: Vec<String> = (0..14).map(|d| format!("l{}", d)).collect();
        let mut solver = ConstraintSolver::default();
        solver.set_access_patterns(vec![AccessPattern::new("T", &["l0", "l13"])]);
        let reduction = solver.search_space_reduction(&names);
        // 14! orders, 13! of them end in l13.
        assert_eq!(reduction.original.loop_orders, 87_178_291_200);
        assert_eq!(reduction.retained_orders, 6_227_020_800);
    }
}
