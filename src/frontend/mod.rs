//! Frontend: problem descriptions.
//!
//! A problem couples the baseline schedule produced by an external
//! polyhedral scheduler with the access patterns of the kernel. Problems are
//! read from JSON:
//!
//! ```text
//! {
//!   "name": "gemm",
//!   "baseline": {
//!     "statements": [
//!       { "dim": 3, "iterators": ["i", "j", "k"],
//!         "matrix": [[1, 0, 0], [0, 0, 1], [0, 1, 0]] }
//!     ]
//!   },
//!   "access_patterns": [
//!     { "array_name": "A", "indices": ["i", "k"] },
//!     { "array_name": "C", "indices": ["i", "j"], "access_frequency": 2, "is_write": true }
//!   ]
//! }
//! ```
//!
//! A few kernels are also available without a file, see [`builtin`].

pub mod builtin;

pub use builtin::{builtin, BUILTIN_NAMES};

use crate::ir::access::MIN_ANALYZABLE_EXTENT;
use crate::ir::{AccessPattern, BaselineSchedule};
use crate::utils::errors::{SearchError, SearchResult};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A kernel to optimize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// Kernel name
    #[serde(default)]
    pub name: String,
    /// Baseline schedule from the external scheduler
    pub baseline: BaselineSchedule,
    /// Array accesses of the loop body
    #[serde(default)]
    pub access_patterns: Vec<AccessPattern>,
}

impl Problem {
    /// Check statement shapes and pattern subscripts.
    pub fn validate(&self) -> SearchResult<()> {
        for (id, stmt) in self.baseline.statements.iter().enumerate() {
            if stmt.iterators.len() > stmt.dim {
                return Err(SearchError::invalid_config(format!(
                    "statement {} names {} iterators but has {} loops",
                    id,
                    stmt.iterators.len(),
                    stmt.dim
                )));
            }
        }
        for pattern in &self.access_patterns {
            if pattern.element_size == 0 {
                return Err(SearchError::invalid_config(format!(
                    "access pattern {} has a zero element size",
                    pattern
                )));
            }
            if pattern.dimension_size < MIN_ANALYZABLE_EXTENT {
                return Err(SearchError::invalid_config(format!(
                    "access pattern {} has extent {}, need at least {}",
                    pattern, pattern.dimension_size, MIN_ANALYZABLE_EXTENT
                )));
            }
        }
        Ok(())
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> SearchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parse a problem description from JSON.
pub fn parse(source: &str) -> SearchResult<Problem> {
    let problem: Problem = serde_json::from_str(source)?;
    problem.validate()?;
    Ok(problem)
}

/// Read and parse a problem file.
pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Problem> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read problem file: {}", path.display()))?;
    let problem =
        parse(&source).with_context(|| format!("Failed to parse problem file: {}", path.display()))?;
    log::debug!(
        "loaded problem '{}' ({} statement(s), {} access pattern(s))",
        problem.name,
        problem.baseline.statements.len(),
        problem.access_patterns.len()
    );
    Ok(problem)
}
