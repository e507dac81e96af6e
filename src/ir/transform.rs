//! Abstract transformation descriptors.
//!
//! A [`Transformation`] carries only what a code generator needs to
//! rewrite a loop nest: the kind, participating loop names and numeric
//! parameters. Nothing here produces code.
//!
//! ```text
//! gpu_tile(i,j; 32x32)      tile i and j by 32, mapped to blocks/threads
//! interchange(k)            place k at this transformation's depth
//! skew(i,j; factor=2)       j' = j + 2*i
//! ```

use crate::utils::errors::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of transformation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// CPU-style rectangular tiling
    Tile,
    /// Tiling mapped onto GPU blocks and threads
    GpuTile,
    /// Loop reordering
    Interchange,
    /// Loop skewing by a factor
    Skew,
    /// Mark a loop parallel
    Parallelize,
    /// Strip-mine a loop by a factor
    Split,
}

impl TransformKind {
    /// Whether the kind carries tile sizes.
    pub fn is_tiling(self) -> bool {
        matches!(self, TransformKind::Tile | TransformKind::GpuTile)
    }

    /// Whether the kind carries a skew/split factor.
    pub fn uses_factor(self) -> bool {
        matches!(self, TransformKind::Skew | TransformKind::Split)
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformKind::Tile => write!(f, "tile"),
            TransformKind::GpuTile => write!(f, "gpu_tile"),
            TransformKind::Interchange => write!(f, "interchange"),
            TransformKind::Skew => write!(f, "skew"),
            TransformKind::Parallelize => write!(f, "parallelize"),
            TransformKind::Split => write!(f, "split"),
        }
    }
}

/// A single transformation applied to one statement's loop nest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transformation {
    /// Transformation kind
    pub kind: TransformKind,
    /// Participating loop dimensions (indices into `iterator_names`)
    #[serde(default)]
    pub loop_dims: Vec<usize>,
    /// Tile sizes, one per entry of `loop_dims` for tiling kinds
    #[serde(default)]
    pub tile_sizes: Vec<i64>,
    /// Iterator names, outermost first; the last one is innermost
    #[serde(default)]
    pub iterator_names: Vec<String>,
    /// Owning statement
    #[serde(default)]
    pub statement_id: usize,
    /// Skew or split factor
    #[serde(default)]
    pub factor: i64,
    /// Nesting depth, 0 = outermost
    #[serde(default)]
    pub depth: usize,
}

impl Transformation {
    /// Create an empty transformation of the given kind.
    pub fn new(kind: TransformKind) -> Self {
        Self {
            kind,
            loop_dims: Vec::new(),
            tile_sizes: Vec::new(),
            iterator_names: Vec::new(),
            statement_id: 0,
            factor: 0,
            depth: 0,
        }
    }

    /// Place the loop `iterator` at this transformation's depth.
    pub fn interchange(iterator: impl Into<String>) -> Self {
        Self {
            iterator_names: vec![iterator.into()],
            ..Self::new(TransformKind::Interchange)
        }
    }

    /// Tile `loop_dims` of `iterator_names` by `tile_sizes`.
    pub fn tile(
        iterator_names: Vec<String>,
        loop_dims: Vec<usize>,
        tile_sizes: Vec<i64>,
    ) -> SearchResult<Self> {
        Self::tiling(TransformKind::Tile, iterator_names, loop_dims, tile_sizes)
    }

    /// GPU-tile `loop_dims` of `iterator_names` by `tile_sizes`.
    pub fn gpu_tile(
        iterator_names: Vec<String>,
        loop_dims: Vec<usize>,
        tile_sizes: Vec<i64>,
    ) -> SearchResult<Self> {
        Self::tiling(TransformKind::GpuTile, iterator_names, loop_dims, tile_sizes)
    }

    fn tiling(
        kind: TransformKind,
        iterator_names: Vec<String>,
        loop_dims: Vec<usize>,
        tile_sizes: Vec<i64>,
    ) -> SearchResult<Self> {
        let trans = Self {
            iterator_names,
            loop_dims,
            tile_sizes,
            ..Self::new(kind)
        };
        trans.validate()?;
        Ok(trans)
    }

    /// Skew `iterator_names[loop_dims[1]]` by `factor` times the first.
    pub fn skew(iterator_names: Vec<String>, loop_dims: Vec<usize>, factor: i64) -> Self {
        Self {
            iterator_names,
            loop_dims,
            factor,
            ..Self::new(TransformKind::Skew)
        }
    }

    /// Strip-mine `iterator` by `factor`.
    pub fn split(iterator: impl Into<String>, factor: i64) -> Self {
        Self {
            iterator_names: vec![iterator.into()],
            loop_dims: vec![0],
            factor,
            ..Self::new(TransformKind::Split)
        }
    }

    /// Mark `iterator` parallel.
    pub fn parallelize(iterator: impl Into<String>) -> Self {
        Self {
            iterator_names: vec![iterator.into()],
            loop_dims: vec![0],
            ..Self::new(TransformKind::Parallelize)
        }
    }

    /// Set the nesting depth.
    pub fn at_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Set the owning statement.
    pub fn for_statement(mut self, statement_id: usize) -> Self {
        self.statement_id = statement_id;
        self
    }

    /// Check the shape invariant of tiling kinds.
    ///
    /// Tile sizes pair up with `loop_dims`, and every tiled dimension must
    /// name an iterator.
    pub fn validate(&self) -> SearchResult<()> {
        if !self.kind.is_tiling() {
            return Ok(());
        }
        if self.tile_sizes.is_empty() {
            return Err(SearchError::invalid_transformation(format!(
                "{} needs at least one tile size",
                self.kind
            )));
        }
        if self.tile_sizes.len() != self.loop_dims.len() {
            return Err(SearchError::invalid_transformation(format!(
                "{} has {} tile sizes for {} tiled dimensions",
                self.kind,
                self.tile_sizes.len(),
                self.loop_dims.len()
            )));
        }
        if let Some(&dim) = self.loop_dims.iter().find(|&&d| d >= self.iterator_names.len()) {
            return Err(SearchError::invalid_transformation(format!(
                "{} tiles dimension {} but only {} iterators are named",
                self.kind,
                dim,
                self.iterator_names.len()
            )));
        }
        Ok(())
    }

    /// The innermost iterator this transformation places.
    pub fn innermost_iterator(&self) -> Option<&str> {
        self.iterator_names.last().map(|s| s.as_str())
    }

    /// Names of the loops that participate, in `loop_dims` order.
    ///
    /// Transformations without explicit dimensions involve every named
    /// iterator.
    pub fn participating_loops(&self) -> Vec<&str> {
        if self.loop_dims.is_empty() {
            return self.iterator_names.iter().map(|s| s.as_str()).collect();
        }
        self.loop_dims
            .iter()
            .filter_map(|&d| self.iterator_names.get(d))
            .map(|s| s.as_str())
            .collect()
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.kind, self.participating_loops().join(","))?;
        if self.kind.is_tiling() && !self.tile_sizes.is_empty() {
            let sizes = self
                .tile_sizes
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join("x");
            write!(f, "; {}", sizes)?;
        }
        if self.kind.uses_factor() {
            write!(f, "; factor={}", self.factor)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tile_invariant() {
        let ok = Transformation::gpu_tile(names(&["i", "j", "k"]), vec![0, 1], vec![32, 32]);
        assert!(ok.is_ok());

        let mismatched = Transformation::tile(names(&["i", "j"]), vec![0, 1], vec![32]);
        assert!(matches!(mismatched, Err(SearchError::InvalidTransformation(_))));

        let out_of_range = Transformation::tile(names(&["i"]), vec![0, 1], vec![32, 32]);
        assert!(out_of_range.is_err());

        let empty = Transformation::tile(names(&["i"]), vec![], vec![]);
        assert!(empty.is_err());
    }

    #[test]
    fn test_non_tiling_kinds_skip_validation() {
        let skew = Transformation::skew(names(&["i", "j"]), vec![0, 1], 2);
        assert!(skew.validate().is_ok());
        assert!(TransformKind::Skew.uses_factor());
        assert!(!TransformKind::Interchange.is_tiling());
    }

    #[test]
    fn test_innermost_iterator() {
        let t = Transformation::gpu_tile(names(&["i", "j"]), vec![0, 1], vec![16, 16]).unwrap();
        assert_eq!(t.innermost_iterator(), Some("j"));
        assert_eq!(Transformation::new(TransformKind::Tile).innermost_iterator(), None);
    }

    #[test]
    fn test_display() {
        let t = Transformation::gpu_tile(names(&["i", "j", "k"]), vec![0, 1], vec![32, 16]).unwrap();
        assert_eq!(t.to_string(), "gpu_tile(i,j; 32x16)");
        assert_eq!(Transformation::interchange("k").to_string(), "interchange(k)");
        assert_eq!(Transformation::split("i", 4).to_string(), "split(i; factor=4)");
        assert_eq!(Transformation::parallelize("i").to_string(), "parallelize(i)");
    }
}
