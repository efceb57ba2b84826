use thiserror::Error;

use super::{CapabilityError, OracleError, PlannerError};
use crate::model::TransitionError;

/// Errors raised while dispatching tasks.
///
/// Everything except [`ExecutorError::DuplicateTaskId`] is a task-level
/// failure: it lands in the task's `state_msg` and never aborts sibling tasks.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(String),

    #[error("Invalid task state: {0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("function {0} not found")]
    CapabilityNotFound(String),

    #[error("invalid arguments for {name}: {source}")]
    InvalidArguments {
        name: String,
        #[source]
        source: CapabilityError,
    },

    #[error("function execution failed: {name}: {source}")]
    CapabilityFailed {
        name: String,
        #[source]
        source: CapabilityError,
    },

    #[error("LLM call failed: {0}")]
    Oracle(#[source] OracleError),

    #[error("agent call failed: {agent}: {source}")]
    DelegateFailed {
        agent: String,
        #[source]
        source: OracleError,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("nested planning failed: {0}")]
    Planning(#[source] PlannerError),

    #[error("{failed} of {total} subtasks failed")]
    SubtasksFailed { failed: usize, total: usize },

    #[error("batch had {failed} failed task(s) out of {total}; first: {first}")]
    BatchFailed {
        failed: usize,
        total: usize,
        first: String,
    },
}

impl From<PlannerError> for ExecutorError {
    fn from(err: PlannerError) -> Self {
        match err {
            PlannerError::Cancelled | PlannerError::Oracle(OracleError::Cancelled) => Self::Cancelled,
            other => Self::Planning(other),
        }
    }
}

impl From<OracleError> for ExecutorError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Cancelled => Self::Cancelled,
            other => Self::Oracle(other),
        }
    }
}
