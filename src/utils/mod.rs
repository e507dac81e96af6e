//! Utility modules shared across the search pipeline.
//!
//! - Error types
//! - Plain-text report formatting

pub mod errors;
pub mod pretty;

// Re-exports
pub use errors::*;
pub use pretty::{format_list, yes_no, ReportWriter};
