//! Merge engine
//!
//! Two-part pattern:
//! 1. Readiness - assess mergeability from PR details (pure, testable)
//! 2. Execute - poll, merge, and clean up (effectful)

mod execute;
mod readiness;

pub use execute::{
    DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL, MergeExecutionResult, MergeOptions,
    execute_merge, wait_for_mergeability,
};
pub use readiness::{BlockReason, Mergeability, assess_mergeability};
