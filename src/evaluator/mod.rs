//! Cost evaluation and best-candidate selection.
//!
//! The evaluator asks a [`CostModel`] for an estimate, applies the
//! bank-conflict penalty on top and writes the result back into each
//! candidate. Randomness is drawn from a generator seeded per candidate
//! (base seed mixed with the candidate fingerprint), so a candidate gets the
//! same estimate no matter where it sits in the list or which thread
//! evaluates it.

pub mod cost;

pub use cost::{
    penalty_multiplier, tile_size_factor, CostModel, HeuristicCostModel, COALESCED_SPEEDUP,
    DEFAULT_BASELINE_COST_MS,
};

use crate::analysis::check_bank_conflict;
use crate::ir::ScheduleConfig;
use crate::utils::errors::{SearchError, SearchResult};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Evaluator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    /// Whether bank conflicts are priced
    pub enable_bank_conflict_penalty: bool,
    /// Penalty factor `F` of the conflict table
    pub penalty_factor: f64,
    /// Nominal cost of the heuristic model in milliseconds
    pub baseline_cost_ms: f64,
    /// Relative noise amplitude of the heuristic model
    pub noise_amplitude: f64,
    /// Base seed for per-candidate noise
    pub seed: u64,
    /// Evaluate candidates on the rayon pool when available
    pub parallel: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            enable_bank_conflict_penalty: true,
            penalty_factor: 2.0,
            baseline_cost_ms: DEFAULT_BASELINE_COST_MS,
            noise_amplitude: 0.10,
            seed: 42,
            parallel: true,
        }
    }
}

impl EvaluatorConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the penalty and set its factor
    pub fn penalty(mut self, enabled: bool, factor: f64) -> Self {
        self.enable_bank_conflict_penalty = enabled;
        self.penalty_factor = factor;
        self
    }

    /// Set the noise amplitude
    pub fn noise(mut self, amplitude: f64) -> Self {
        self.noise_amplitude = amplitude;
        self
    }

    /// Set the base seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable/disable parallel evaluation
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check factor, cost and noise ranges.
    pub fn validate(&self) -> SearchResult<()> {
        if !self.penalty_factor.is_finite() || self.penalty_factor <= 0.0 {
            return Err(SearchError::invalid_config(format!(
                "penalty factor must be positive, got {}",
                self.penalty_factor
            )));
        }
        if !self.baseline_cost_ms.is_finite() || self.baseline_cost_ms <= 0.0 {
            return Err(SearchError::invalid_config(format!(
                "baseline cost must be positive, got {}",
                self.baseline_cost_ms
            )));
        }
        if !(0.0..1.0).contains(&self.noise_amplitude) {
            return Err(SearchError::invalid_config(format!(
                "noise amplitude must be in [0, 1), got {}",
                self.noise_amplitude
            )));
        }
        Ok(())
    }
}

/// Evaluates candidates and picks the cheapest one.
pub struct CostEvaluator {
    config: EvaluatorConfig,
    model: Box<dyn CostModel>,
}

impl fmt::Debug for CostEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CostEvaluator")
            .field("config", &self.config)
            .field("model", &self.model.name())
            .finish()
    }
}

impl Default for CostEvaluator {
    fn default() -> Self {
        Self::new(EvaluatorConfig::default())
    }
}

impl CostEvaluator {
    /// Evaluator backed by the heuristic model.
    pub fn new(config: EvaluatorConfig) -> Self {
        let model = HeuristicCostModel::new(config.baseline_cost_ms, config.noise_amplitude);
        Self::with_model(config, Box::new(model))
    }

    /// Evaluator backed by a custom model.
    pub fn with_model(config: EvaluatorConfig, model: Box<dyn CostModel>) -> Self {
        Self { config, model }
    }

    /// Current settings.
    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Name of the cost model.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Enable or disable the bank-conflict penalty and set its factor.
    pub fn set_bank_conflict_penalty(&mut self, enabled: bool, factor: f64) {
        self.config.enable_bank_conflict_penalty = enabled;
        self.config.penalty_factor = factor;
    }

    fn rng_for(&self, config: &ScheduleConfig) -> StdRng {
        StdRng::seed_from_u64(self.config.seed ^ config.fingerprint().rotate_left(17))
    }

    /// Estimated time of `config`, penalized for bank conflicts if enabled.
    ///
    /// Failed estimates (`<= 0`) are returned unchanged.
    pub fn evaluate_config(&self, config: &ScheduleConfig) -> f64 {
        let mut rng = self.rng_for(config);
        let raw = self.model.estimate(config, &mut rng);
        if raw <= 0.0 || !self.config.enable_bank_conflict_penalty {
            return raw;
        }
        if check_bank_conflict(config).is_conflict() {
            self.compute_penalized_score(config, raw)
        } else {
            raw
        }
    }

    /// `raw_time` scaled by the penalty for the conflict degree of `config`.
    pub fn compute_penalized_score(&self, config: &ScheduleConfig, raw_time: f64) -> f64 {
        let way = check_bank_conflict(config).way;
        raw_time * penalty_multiplier(way, self.config.penalty_factor)
    }

    fn evaluate_one(&self, config: &mut ScheduleConfig) {
        let time = self.evaluate_config(config);
        config.execution_time_ms = time;
        config.is_valid = time > 0.0;
        debug!("{} -> {:.3} ms", config.describe(), time);
    }

    /// Write time and validity into every candidate.
    pub fn evaluate_in_place(&self, candidates: &mut [ScheduleConfig]) {
        #[cfg(feature = "parallel")]
        {
            if self.config.parallel {
                candidates.par_iter_mut().for_each(|c| self.evaluate_one(c));
                return;
            }
        }
        candidates.iter_mut().for_each(|c| self.evaluate_one(c));
    }

    /// Evaluate all candidates and return the cheapest successful one.
    ///
    /// Ties go to the earlier candidate. Without any success the result is
    /// [`ScheduleConfig::failed`], whose time is `-1`.
    pub fn search_best_config(&self, candidates: &mut [ScheduleConfig]) -> ScheduleConfig {
        self.evaluate_in_place(candidates);
        let mut best: Option<&ScheduleConfig> = None;
        for candidate in candidates.iter() {
            if candidate.execution_time_ms <= 0.0 {
                continue;
            }
            if best.map_or(true, |b| candidate.execution_time_ms < b.execution_time_ms) {
                info!(
                    "new best: {} ({:.3} ms)",
                    candidate.describe(),
                    candidate.execution_time_ms
                );
                best = Some(candidate);
            }
        }
        match best {
            Some(b) => b.clone(),
            None => {
                info!("no candidate evaluated successfully");
                ScheduleConfig::failed()
            }
        }
    }

    /// Evaluate all candidates and sort them by time, failures last.
    pub fn evaluate_all_configs(&self, mut candidates: Vec<ScheduleConfig>) -> Vec<ScheduleConfig> {
        self.evaluate_in_place(&mut candidates);
        candidates.sort_by(compare_by_time);
        candidates
    }
}

/// Ascending time order with every invalid candidate after every valid one.
pub fn compare_by_time(a: &ScheduleConfig, b: &ScheduleConfig) -> Ordering {
    let valid = |c: &ScheduleConfig| c.is_valid && c.execution_time_ms > 0.0;
    match (valid(a), valid(b)) {
        (true, true) => a.execution_time_ms.total_cmp(&b.execution_time_ms),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel(f64);

    impl CostModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn estimate(&self, _config: &ScheduleConfig, _rng: &mut StdRng) -> f64 {
            self.0
        }
    }

    /// Time equal to the tile size of `i`, failure without one.
    struct TileAsTime;

    impl CostModel for TileAsTime {
        fn name(&self) -> &str {
            "tile-as-time"
        }

        fn estimate(&self, config: &ScheduleConfig, _rng: &mut StdRng) -> f64 {
            config.tile_size("i").map_or(-1.0, |s| s as f64)
        }
    }

    fn tiled(size: i64) -> ScheduleConfig {
        let mut config = ScheduleConfig::from_loop_order(&["i", "j"]);
        config.set_tile_size("i", size);
        config
    }

    fn noiseless() -> EvaluatorConfig {
        EvaluatorConfig::default().noise(0.0).parallel(false)
    }

    #[test]
    fn test_config_validation() {
        assert!(EvaluatorConfig::default().validate().is_ok());
        assert!(EvaluatorConfig::default().penalty(true, 0.0).validate().is_err());
        assert!(EvaluatorConfig::default().noise(1.0).validate().is_err());
        assert!(EvaluatorConfig::default().noise(-0.1).validate().is_err());
    }

    #[test]
    fn test_penalty_applied_only_on_conflict() {
        let evaluator = CostEvaluator::new(noiseless());
        let clean = evaluator.evaluate_config(&tiled(32));
        let conflicted = evaluator.evaluate_config(&tiled(48));
        // avg(48) = 48 sits in the sweet spot too; 16-way costs 4F.
        assert!((clean - 56.0).abs() < 1e-9);
        assert!((conflicted - 56.0 * 8.0).abs() < 1e-9);

        let mut evaluator = evaluator;
        evaluator.set_bank_conflict_penalty(false, 2.0);
        assert!((evaluator.evaluate_config(&tiled(48)) - 56.0).abs() < 1e-9);
    }

    #[test]
    fn test_penalized_score() {
        let evaluator = CostEvaluator::new(noiseless().penalty(true, 3.0));
        assert_eq!(evaluator.compute_penalized_score(&tiled(34), 10.0), 30.0);
        assert_eq!(evaluator.compute_penalized_score(&tiled(32), 10.0), 10.0);
    }

    #[test]
    fn test_all_failed_returns_sentinel() {
        let evaluator = CostEvaluator::with_model(noiseless(), Box::new(FixedModel(-1.0)));
        let mut candidates = vec![tiled(32), tiled(64)];
        let best = evaluator.search_best_config(&mut candidates);
        assert_eq!(best.execution_time_ms, -1.0);
        assert!(!best.is_valid);
        assert!(candidates.iter().all(|c| !c.is_valid));

        let zero = CostEvaluator::with_model(noiseless(), Box::new(FixedModel(0.0)));
        assert_eq!(zero.search_best_config(&mut [tiled(16)]).execution_time_ms, -1.0);
        assert_eq!(zero.search_best_config(&mut []).execution_time_ms, -1.0);
    }

    #[test]
    fn test_first_minimum_wins() {
        let evaluator = CostEvaluator::with_model(noiseless(), Box::new(TileAsTime));
        let mut candidates = vec![
            tiled(64).with_description("a"),
            ScheduleConfig::from_loop_order(&["i"]).with_description("fails"),
            tiled(16).with_description("b"),
            tiled(16).with_description("c"),
        ];
        let best = evaluator.search_best_config(&mut candidates);
        assert_eq!(best.description, "b");
        assert!(!candidates[1].is_valid);
    }

    #[test]
    fn test_sorted_with_failures_last() {
        let evaluator = CostEvaluator::with_model(noiseless(), Box::new(TileAsTime));
        let sorted = evaluator.evaluate_all_configs(vec![
            ScheduleConfig::from_loop_order(&["i"]).with_description("x"),
            tiled(64),
            ScheduleConfig::from_loop_order(&["j"]).with_description("y"),
            tiled(16),
        ]);
        let times: Vec<_> = sorted.iter().map(|c| c.execution_time_ms).collect();
        assert_eq!(times, vec![16.0, 64.0, -1.0, -1.0]);
        assert_eq!(sorted[2].description, "x");
        assert_eq!(sorted[3].description, "y");
    }

    #[test]
    fn test_noise_is_per_candidate() {
        let evaluator = CostEvaluator::new(EvaluatorConfig::default().parallel(false));
        let a = tiled(32);
        let b = tiled(64);
        let forward = evaluator.evaluate_all_configs(vec![a.clone(), b.clone()]);
        let backward = evaluator.evaluate_all_configs(vec![b, a]);
        let lookup = |list: &[ScheduleConfig], size: i64| {
            list.iter()
                .find(|c| c.tile_size("i") == Some(size))
                .map(|c| c.execution_time_ms)
        };
        assert_eq!(lookup(&forward, 32), lookup(&backward, 32));
        assert_eq!(lookup(&forward, 64), lookup(&backward, 64));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let candidates: Vec<_> = [8, 16, 32, 48, 64, 128, 256]
            .iter()
            .map(|&s| tiled(s))
            .collect();
        let sequential = CostEvaluator::new(EvaluatorConfig::default().parallel(false));
        let parallel = CostEvaluator::new(EvaluatorConfig::default().parallel(true));
        let mut seq = candidates.clone();
        let mut par = candidates;
        let best_seq = sequential.search_best_config(&mut seq);
        let best_par = parallel.search_best_config(&mut par);
        assert_eq!(best_seq, best_par);
        assert_eq!(seq, par);
    }
}
