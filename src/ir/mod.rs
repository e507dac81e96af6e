//! Data model of the schedule search.
//!
//! - [`access`]: per-array access patterns
//! - [`transform`]: abstract transformation descriptors
//! - [`schedule`]: candidate configurations
//! - [`baseline`]: the externally computed starting schedule

pub mod access;
pub mod baseline;
pub mod schedule;
pub mod transform;

pub use access::AccessPattern;
pub use baseline::{BaselineSchedule, BaselineStmt, TransformMatrix};
pub use schedule::{ScheduleConfig, TileSize, UNEVALUATED};
pub use transform::{TransformKind, Transformation};
