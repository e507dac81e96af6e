//! Array access patterns.
//!
//! An [`AccessPattern`] describes how one array is subscripted inside the
//! loop nest, e.g. `A[i][k]` becomes `indices = ["i", "k"]`. Storage is
//! assumed row-major, so the last subscript is the fastest-varying one.

use serde::{Deserialize, Serialize};

/// Multiplier applied to the weight of written arrays.
pub const WRITE_PRIORITY: f64 = 1.5;

/// Smallest axis extent for which unit stride identifies the fastest subscript.
///
/// With an extent of 1 every stride product collapses to 1.
pub const MIN_ANALYZABLE_EXTENT: i64 = 2;

/// One array's access pattern inside a loop nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPattern {
    /// Array identifier
    pub array_name: String,
    /// Index variables, outermost subscript first
    pub indices: Vec<String>,
    /// 1 for read-only arrays, 2 for read-write arrays
    #[serde(default = "default_access_frequency")]
    pub access_frequency: i64,
    /// Element size in bytes
    #[serde(default = "default_element_size")]
    pub element_size: usize,
    /// Uniform per-axis extent, used for both volume and stride arithmetic
    #[serde(default = "default_dimension_size")]
    pub dimension_size: i64,
    /// Whether the array is written
    #[serde(default)]
    pub is_write: bool,
}

fn default_access_frequency() -> i64 {
    1
}

fn default_element_size() -> usize {
    4
}

fn default_dimension_size() -> i64 {
    1024
}

impl AccessPattern {
    /// Create a read-only pattern with 4-byte elements and 1024-wide axes.
    pub fn new<S: AsRef<str>>(array_name: &str, indices: &[S]) -> Self {
        Self {
            array_name: array_name.to_string(),
            indices: indices.iter().map(|s| s.as_ref().to_string()).collect(),
            access_frequency: default_access_frequency(),
            element_size: default_element_size(),
            dimension_size: default_dimension_size(),
            is_write: false,
        }
    }

    /// Create a read-only pattern.
    pub fn read_only<S: AsRef<str>>(array_name: &str, indices: &[S]) -> Self {
        Self::new(array_name, indices)
    }

    /// Create a read-write pattern (frequency 2, written).
    pub fn read_write<S: AsRef<str>>(array_name: &str, indices: &[S]) -> Self {
        Self {
            access_frequency: 2,
            is_write: true,
            ..Self::new(array_name, indices)
        }
    }

    /// Set the access frequency.
    pub fn frequency(mut self, frequency: i64) -> Self {
        self.access_frequency = frequency;
        self
    }

    /// Set the element size in bytes.
    pub fn element_size(mut self, bytes: usize) -> Self {
        self.element_size = bytes;
        self
    }

    /// Set the per-axis extent.
    pub fn dimension_size(mut self, size: i64) -> Self {
        self.dimension_size = size;
        self
    }

    /// Mark the pattern as written or read-only.
    pub fn write(mut self, is_write: bool) -> Self {
        self.is_write = is_write;
        self
    }

    /// The fastest-varying subscript under row-major storage.
    pub fn fastest_index(&self) -> Option<&str> {
        self.indices.last().map(|s| s.as_str())
    }

    /// Whether the pattern can take part in coalescing analysis: it needs
    /// subscripts and an extent of at least [`MIN_ANALYZABLE_EXTENT`].
    pub fn is_analyzable(&self) -> bool {
        !self.indices.is_empty() && self.dimension_size >= MIN_ANALYZABLE_EXTENT
    }

    /// Byte-traffic weight `freq * element_size * dimension_size`, scaled
    /// by [`WRITE_PRIORITY`] for written arrays.
    pub fn weight(&self) -> f64 {
        let base =
            self.access_frequency as f64 * self.element_size as f64 * self.dimension_size as f64;
        if self.is_write {
            base * WRITE_PRIORITY
        } else {
            base
        }
    }
}

impl std::fmt::Display for AccessPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.array_name)?;
        for idx in &self.indices {
            write!(f, "[{}]", idx)?;
        }
        if self.is_write {
            write!(f, " (rw)")?;
        }
        Ok(())
    }
}
