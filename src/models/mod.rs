//! Data models for test scheduling
//!
//! This module contains the plan-side and result-side data structures used
//! throughout the scheduler.

mod outcome;
mod test_case;

pub use outcome::{
    AssertKind, AssertedExpr, ExprKind, Outcome, PanicKind, PoolResult, RunSummary, TestFailure,
};
pub use test_case::{batches_from_groups, flatten, partition, Batch, Test};
