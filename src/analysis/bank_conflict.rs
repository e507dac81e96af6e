//! Shared-memory bank-conflict estimation.
//!
//! Shared memory is split into [`SHARED_MEMORY_BANKS`] banks. A tile
//! extent that is a multiple of the bank count maps consecutive rows onto
//! the same bank pattern and is conflict-free; any other extent leaves a
//! remainder `r = s mod 32`, and the conflict degree is the largest
//! `d ∈ [2, 32]` dividing both 32 and `r`.

use crate::ir::ScheduleConfig;
use std::fmt;

/// Number of shared-memory banks.
pub const SHARED_MEMORY_BANKS: i64 = 32;

/// Tile extents known to perform badly regardless of the formula.
pub const KNOWN_BAD_TILE_SIZES: [i64; 3] = [17, 33, 65];

/// Bank-conflict degree of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BankConflict {
    /// Number of colliding accesses, 1 = conflict-free
    pub way: u32,
}

impl BankConflict {
    /// No conflict.
    pub const NONE: BankConflict = BankConflict { way: 1 };

    /// Whether accesses serialize at all.
    pub fn is_conflict(self) -> bool {
        self.way > 1
    }
}

impl fmt::Display for BankConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_conflict() {
            write!(f, "{}-way", self.way)
        } else {
            write!(f, "conflict-free")
        }
    }
}

/// Conflict degree caused by a single tile extent.
pub fn conflict_degree(size: i64) -> u32 {
    let mut way = 1u32;
    let remainder = size.rem_euclid(SHARED_MEMORY_BANKS);
    if remainder != 0 {
        if let Some(d) = (2..=SHARED_MEMORY_BANKS)
            .rev()
            .find(|d| SHARED_MEMORY_BANKS % d == 0 && remainder % d == 0)
        {
            way = d as u32;
        }
    }
    if KNOWN_BAD_TILE_SIZES.contains(&size) {
        way = way.max(2);
    }
    way
}

/// Worst conflict degree over all tile sizes of `config`.
pub fn check_bank_conflict(config: &ScheduleConfig) -> BankConflict {
    let way = config
        .tile_values()
        .map(conflict_degree)
        .fold(1, u32::max);
    BankConflict { way }
}
