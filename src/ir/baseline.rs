//! Baseline schedules handed over by an external polyhedral scheduler.
//!
//! The search treats the baseline as opaque: per statement it only reads
//! the loop depth, the iterator names and, optionally, the rows of the
//! transformation matrix. The matrix is used for two things, inferring
//! the loop order and deciding whether the innermost hyperplane keeps the
//! fastest-varying dimension innermost.
//!
//! ```text
//!   h0 = [ 1 0 0 | 0 ]    i outermost
//!   h1 = [ 0 0 1 | 0 ]    k
//!   h2 = [ 0 1 0 | 0 ]    j innermost
//! ```

use super::transform::Transformation;
use crate::utils::pretty::{format_list, ReportWriter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tile size used when turning a baseline into tiling descriptors.
pub const DEFAULT_BASELINE_TILE: i64 = 32;

/// Maximum number of dimensions tiled from a baseline statement.
pub const MAX_BASELINE_TILED_DIMS: usize = 3;

const DEFAULT_ITERATORS: [&str; 6] = ["i", "j", "k", "l", "m", "n"];

/// Default name of iterator `d` when the scheduler did not provide one.
pub fn default_iterator_name(d: usize) -> String {
    DEFAULT_ITERATORS
        .get(d)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("i{}", d))
}

/// Rows of a statement's transformation matrix, outermost hyperplane first.
///
/// Each row holds one coefficient per loop dimension, optionally followed
/// by parameter and constant columns which are ignored here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformMatrix {
    /// Hyperplane coefficients
    pub rows: Vec<Vec<i64>>,
}

impl TransformMatrix {
    /// Wrap matrix rows.
    pub fn new(rows: Vec<Vec<i64>>) -> Self {
        Self { rows }
    }

    /// Number of hyperplanes.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    fn coeff(&self, row: usize, col: usize) -> i64 {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(0)
    }

    /// Dimension dominating each hyperplane, outer to inner.
    ///
    /// For every row (up to `dim` of them) this picks the dimension with the
    /// largest absolute coefficient, the first one on ties. Without rows the
    /// identity order is returned. The result is not necessarily a
    /// permutation: skewed hyperplanes can repeat a dimension.
    pub fn loop_order(&self, dim: usize) -> Vec<usize> {
        if self.rows.is_empty() {
            return (0..dim).collect();
        }
        (0..self.n_rows().min(dim))
            .map(|h| {
                let mut max_dim = 0;
                let mut max_coeff = 0i64;
                for d in 0..dim {
                    let c = self.coeff(h, d);
                    if c.abs() > max_coeff.abs() {
                        max_coeff = c;
                        max_dim = d;
                    }
                }
                max_dim
            })
            .collect()
    }

    /// Whether the innermost hyperplane has a positive coefficient on the
    /// last loop dimension.
    pub fn innermost_coalesced(&self, dim: usize) -> bool {
        if dim == 0 || self.rows.is_empty() {
            return false;
        }
        self.coeff(self.n_rows() - 1, dim - 1) >= 1
    }
}

/// One statement of the baseline schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineStmt {
    /// Number of loop dimensions
    pub dim: usize,
    /// Iterator names, outermost first; missing entries get defaults
    #[serde(default)]
    pub iterators: Vec<String>,
    /// Optional transformation-matrix hint
    #[serde(default)]
    pub matrix: Option<TransformMatrix>,
    /// Optional statement text
    #[serde(default)]
    pub text: Option<String>,
}

impl BaselineStmt {
    /// Statement whose depth is the number of iterators given.
    pub fn new<S: AsRef<str>>(iterators: &[S]) -> Self {
        Self {
            dim: iterators.len(),
            iterators: iterators.iter().map(|s| s.as_ref().to_string()).collect(),
            matrix: None,
            text: None,
        }
    }

    /// Attach a transformation-matrix hint.
    pub fn with_matrix(mut self, matrix: TransformMatrix) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// Attach the statement text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Iterator names for all `dim` dimensions, defaulting missing ones.
    pub fn iterator_names(&self) -> Vec<String> {
        (0..self.dim)
            .map(|d| match self.iterators.get(d) {
                Some(name) if !name.is_empty() => name.clone(),
                _ => default_iterator_name(d),
            })
            .collect()
    }

    /// Loop order inferred from the matrix hint, if it is a permutation.
    pub fn hinted_order(&self) -> Option<Vec<usize>> {
        let matrix = self.matrix.as_ref()?;
        let order = matrix.loop_order(self.dim);
        let mut seen = vec![false; self.dim];
        if order.len() != self.dim {
            return None;
        }
        for &d in &order {
            if seen[d] {
                return None;
            }
            seen[d] = true;
        }
        Some(order)
    }

    /// Iterator names outermost to innermost, following the matrix hint when
    /// it describes a permutation and declaration order otherwise.
    pub fn ordered_iterators(&self) -> Vec<String> {
        let names = self.iterator_names();
        match self.hinted_order() {
            Some(order) => order.into_iter().map(|d| names[d].clone()).collect(),
            None => names,
        }
    }

    /// Whether the matrix hint keeps the innermost dimension coalesced.
    pub fn innermost_coalesced(&self) -> bool {
        self.matrix
            .as_ref()
            .map_or(false, |m| m.innermost_coalesced(self.dim))
    }
}

/// A baseline schedule: the statements of one scheduled program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineSchedule {
    /// Statements in program order
    pub statements: Vec<BaselineStmt>,
    /// Number of symbolic parameters
    #[serde(default)]
    pub num_params: usize,
}

impl BaselineSchedule {
    /// Baseline without symbolic parameters.
    pub fn new(statements: Vec<BaselineStmt>) -> Self {
        Self {
            statements,
            num_params: 0,
        }
    }

    /// Single-statement baseline over the given iterators.
    pub fn single<S: AsRef<str>>(iterators: &[S]) -> Self {
        Self::new(vec![BaselineStmt::new(iterators)])
    }

    /// Whether the program has no statements.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// The statement the search operates on.
    pub fn primary(&self) -> Option<&BaselineStmt> {
        self.statements.first()
    }

    /// Loop depth of the primary statement.
    pub fn num_dims(&self) -> usize {
        self.primary().map_or(0, |s| s.dim)
    }

    /// Iterator names of the primary statement in declaration order.
    pub fn iterator_names(&self) -> Vec<String> {
        self.primary().map(|s| s.iterator_names()).unwrap_or_default()
    }

    /// Tiling descriptors implied by the baseline.
    ///
    /// Every statement with a matrix and at least two loops gets one tiling
    /// over its first dimensions: GPU tiling when the innermost hyperplane is
    /// coalesced, plain tiling otherwise.
    pub fn extract_transformations(&self) -> Vec<Transformation> {
        let mut transforms = Vec::new();
        for (id, stmt) in self.statements.iter().enumerate() {
            if stmt.matrix.as_ref().map_or(true, |m| m.n_rows() == 0) || stmt.dim < 2 {
                continue;
            }
            let tiled = stmt.dim.min(MAX_BASELINE_TILED_DIMS);
            let names = stmt.iterator_names();
            let dims: Vec<usize> = (0..tiled).collect();
            let sizes = vec![DEFAULT_BASELINE_TILE; tiled];
            let built = if stmt.innermost_coalesced() {
                Transformation::gpu_tile(names, dims, sizes)
            } else {
                Transformation::tile(names, dims, sizes)
            };
            // `dims` index into `names` by construction, so this cannot fail.
            if let Ok(trans) = built {
                transforms.push(trans.for_statement(id).at_depth(stmt.dim));
            }
        }
        log::debug!("extracted {} baseline transformations", transforms.len());
        transforms
    }
}

impl fmt::Display for BaselineSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut w = ReportWriter::default_indent();
        w.section("Baseline schedule");
        w.field("Statements", 12, self.statements.len());
        w.field("Parameters", 12, self.num_params);
        for (s, stmt) in self.statements.iter().enumerate() {
            w.block(&format!("Statement {}:", s), |w| {
                w.field("Dimensions", 11, stmt.dim);
                w.field("Iterators", 11, format_list(&stmt.iterator_names(), ", "));
                if let Some(ref text) = stmt.text {
                    w.field("Text", 11, text);
                }
                if let Some(ref matrix) = stmt.matrix {
                    let names = stmt.iterator_names();
                    let order = matrix.loop_order(stmt.dim);
                    w.block("Loop order:", |w| {
                        for (level, &d) in order.iter().enumerate() {
                            let mut line = format!("level {}: {}", level, names[d]);
                            if level + 1 == order.len() {
                                line.push_str(if stmt.innermost_coalesced() {
                                    "  <- innermost (coalesced)"
                                } else {
                                    "  <- innermost"
                                });
                            }
                            w.writeln(&line);
                        }
                    });
                }
            });
        }
        write!(f, "{}", w.finish())
    }
}
