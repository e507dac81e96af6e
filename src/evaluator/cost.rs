//! Cost models.
//!
//! A [`CostModel`] maps a configuration to an estimated execution time in
//! milliseconds. A non-positive result means the evaluation failed. The
//! evaluator owns the random source and hands each call a generator seeded
//! for that configuration, so models stay pure functions of their inputs.

use crate::analysis::satisfies_coalescing_constraint;
use crate::ir::ScheduleConfig;
use rand::rngs::StdRng;
use rand::Rng;

/// Nominal cost of an untransformed kernel.
pub const DEFAULT_BASELINE_COST_MS: f64 = 100.0;
/// Multiplier for a coalesced configuration.
pub const COALESCED_SPEEDUP: f64 = 0.7;

/// Estimates execution time for a configuration.
pub trait CostModel: Send + Sync {
    /// Short model name for logs and reports.
    fn name(&self) -> &str;

    /// Estimated time in milliseconds; `<= 0` signals failure.
    fn estimate(&self, config: &ScheduleConfig, rng: &mut StdRng) -> f64;
}

/// Tile-size sweet-spot factor for the average tile extent.
pub fn tile_size_factor(avg_tile: i64) -> f64 {
    if (32..=64).contains(&avg_tile) {
        0.8
    } else if avg_tile < 16 {
        1.3
    } else if avg_tile > 128 {
        1.2
    } else {
        1.0
    }
}

/// Slowdown applied for an `way`-way bank conflict with penalty factor `f`.
pub fn penalty_multiplier(way: u32, f: f64) -> f64 {
    match way {
        0 | 1 => 1.0,
        2 => f,
        4 => 1.5 * f,
        8 => 2.0 * f,
        16 => 4.0 * f,
        32 => 16.0 * f,
        w => w as f64 * (f / 2.0),
    }
}

/// Heuristic estimator: nominal cost scaled by tile size, coalescing and
/// bounded noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicCostModel {
    /// Nominal cost in milliseconds
    pub baseline_ms: f64,
    /// Relative noise amplitude, e.g. 0.1 for ±10%
    pub noise: f64,
}

impl Default for HeuristicCostModel {
    fn default() -> Self {
        Self {
            baseline_ms: DEFAULT_BASELINE_COST_MS,
            noise: 0.10,
        }
    }
}

impl HeuristicCostModel {
    /// Model with the given baseline time and relative noise.
    pub fn new(baseline_ms: f64, noise: f64) -> Self {
        Self { baseline_ms, noise }
    }

    /// Average tile extent, rounded down. `None` without tiles.
    pub fn average_tile_size(config: &ScheduleConfig) -> Option<i64> {
        let count = config.tile_sizes.len() as i64;
        if count == 0 {
            return None;
        }
        Some(config.tile_values().sum::<i64>() / count)
    }
}

impl CostModel for HeuristicCostModel {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn estimate(&self, config: &ScheduleConfig, rng: &mut StdRng) -> f64 {
        let mut time = self.baseline_ms;
        if let Some(avg) = Self::average_tile_size(config) {
            time *= tile_size_factor(avg);
        }
        if satisfies_coalescing_constraint(config) {
            time *= COALESCED_SPEEDUP;
        }
        if self.noise > 0.0 {
            time *= rng.gen_range(1.0 - self.noise..=1.0 + self.noise);
        }
        time
    }
}
