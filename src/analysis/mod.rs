//! Analysis passes over schedule configurations.
//!
//! Everything here is a pure function of a [`ScheduleConfig`](crate::ir::ScheduleConfig)
//! and, where relevant, the registered access patterns. The solver and the
//! evaluator both call into these passes.

pub mod bank_conflict;
pub mod coalescing;
pub mod space;

pub use bank_conflict::{check_bank_conflict, conflict_degree, BankConflict, SHARED_MEMORY_BANKS};
pub use coalescing::{
    check_coalescing_for_pattern, coalescing_status, compute_stride_for_pattern,
    compute_weighted_coalescing_score, satisfies_coalescing_constraint,
};
pub use space::{
    best_order, count_retained_orders, loop_orders, score_loop_orders, LoopOrders, ScoredOrder,
    SearchSpaceEstimate, SpaceReduction,
};
