use std::time::Duration;

use thiserror::Error;

use super::OracleError;

/// Errors surfaced by one planning attempt.
///
/// Unparsable oracle output is not an error: the planner recovers with a
/// deterministic fallback plan instead.
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("max planning depth reached (depth {depth}, budget has {budget} level(s))")]
    DepthExceeded { depth: usize, budget: usize },

    #[error("LLM call failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("planning timed out after {0:?}")]
    Timeout(Duration),

    #[error("planning cancelled")]
    Cancelled,
}
