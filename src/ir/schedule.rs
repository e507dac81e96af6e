//! Schedule configurations: the candidates of the search.
//!
//! A [`ScheduleConfig`] is created by a generator with a fixed list of
//! transformations, annotated in place by the constraint filter and the
//! evaluator, and treated as read-only once it is selected as best.

use super::transform::Transformation;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Execution time of a candidate that has not been (successfully) evaluated.
pub const UNEVALUATED: f64 = -1.0;

/// Tile size for one named loop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileSize {
    /// Loop the size applies to
    pub loop_name: String,
    /// Tile extent
    pub size: i64,
}

impl TileSize {
    /// Create a tile size entry.
    pub fn new(loop_name: impl Into<String>, size: i64) -> Self {
        Self {
            loop_name: loop_name.into(),
            size,
        }
    }
}

/// A candidate loop-nest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Transformations, outermost first
    pub transformations: Vec<Transformation>,
    /// Tile size table keyed by loop name
    pub tile_sizes: Vec<TileSize>,
    /// Estimated time in milliseconds, [`UNEVALUATED`] until evaluated
    pub execution_time_ms: f64,
    /// Whether evaluation succeeded
    pub is_valid: bool,
    /// Whether the coarse coalescing predicate failed
    pub has_coalescing_violation: bool,
    /// Whether any tile size causes shared-memory bank conflicts
    pub has_bank_conflict: bool,
    /// Conflict degree, 1 = no conflict
    pub bank_conflict_way: u32,
    /// Weighted coalescing score against the registered access patterns
    pub weighted_coalescing_score: f64,
    /// Per-array coalescing status
    pub array_coalescing_status: BTreeMap<String, bool>,
    /// Human-readable description
    pub description: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            transformations: Vec::new(),
            tile_sizes: Vec::new(),
            execution_time_ms: UNEVALUATED,
            is_valid: true,
            has_coalescing_violation: false,
            has_bank_conflict: false,
            bank_conflict_way: 1,
            weighted_coalescing_score: 0.0,
            array_coalescing_status: BTreeMap::new(),
            description: String::new(),
        }
    }
}

impl ScheduleConfig {
    /// Unevaluated configuration with no transformations.
    pub fn new() -> Self {
        Self::default()
    }

    /// The sentinel returned when no candidate could be evaluated.
    pub fn failed() -> Self {
        Self {
            is_valid: false,
            description: "no valid configuration".to_string(),
            ..Self::default()
        }
    }

    /// Interchange-only configuration placing `loops` outermost first.
    pub fn from_loop_order<S: AsRef<str>>(loops: &[S]) -> Self {
        let transformations = loops
            .iter()
            .enumerate()
            .map(|(depth, name)| Transformation::interchange(name.as_ref()).at_depth(depth))
            .collect();
        Self {
            transformations,
            ..Self::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a transformation one level deeper than any existing one.
    pub fn push_transformation(&mut self, trans: Transformation) {
        let depth = self
            .transformations
            .iter()
            .map(|t| t.depth + 1)
            .max()
            .unwrap_or(0);
        self.transformations.push(trans.at_depth(depth));
    }

    /// The innermost transformation: greatest depth, later entries win ties.
    pub fn innermost(&self) -> Option<&Transformation> {
        self.transformations.iter().max_by_key(|t| t.depth)
    }

    /// The innermost loop variable, used by all coalescing analysis.
    pub fn innermost_loop(&self) -> Option<&str> {
        self.innermost().and_then(|t| t.innermost_iterator())
    }

    /// Loop names ordered outermost to innermost.
    pub fn loop_order(&self) -> Vec<&str> {
        let mut ordered: Vec<&Transformation> = self.transformations.iter().collect();
        ordered.sort_by_key(|t| t.depth);
        ordered
            .into_iter()
            .filter_map(|t| t.innermost_iterator())
            .collect()
    }

    /// Tile size recorded for `loop_name`.
    pub fn tile_size(&self, loop_name: &str) -> Option<i64> {
        self.tile_sizes
            .iter()
            .find(|ts| ts.loop_name == loop_name)
            .map(|ts| ts.size)
    }

    /// Set the tile size for `loop_name`, replacing any previous entry.
    pub fn set_tile_size(&mut self, loop_name: &str, size: i64) {
        match self.tile_sizes.iter_mut().find(|ts| ts.loop_name == loop_name) {
            Some(ts) => ts.size = size,
            None => self.tile_sizes.push(TileSize::new(loop_name, size)),
        }
    }

    /// All tile extents in table order.
    pub fn tile_values(&self) -> impl Iterator<Item = i64> + '_ {
        self.tile_sizes.iter().map(|ts| ts.size)
    }

    /// Whether an evaluation produced a positive time.
    pub fn is_evaluated(&self) -> bool {
        self.execution_time_ms > 0.0
    }

    /// Stable hash of the structural part (transformations and tiles).
    ///
    /// Annotations and the description do not take part, so the value is
    /// the same before and after filtering or evaluation.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.transformations.hash(&mut hasher);
        self.tile_sizes.hash(&mut hasher);
        hasher.finish()
    }

    /// Compact descriptor, e.g. `interchange(i) > interchange(j) | tiles i=32,j=32`.
    pub fn describe(&self) -> String {
        let mut ordered: Vec<&Transformation> = self.transformations.iter().collect();
        ordered.sort_by_key(|t| t.depth);
        let mut desc = if ordered.is_empty() {
            "identity".to_string()
        } else {
            ordered
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(" > ")
        };
        if !self.tile_sizes.is_empty() {
            let tiles = self
                .tile_sizes
                .iter()
                .map(|ts| format!("{}={}", ts.loop_name, ts.size))
                .collect::<Vec<_>>()
                .join(",");
            desc.push_str(&format!(" | tiles {}", tiles));
        }
        desc
    }
}

impl fmt::Display for ScheduleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.describe())
        } else {
            write!(f, "{}: {}", self.description, self.describe())
        }
    }
}
