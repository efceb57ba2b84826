//! Task lifecycle rules.

use super::task::TaskState;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: TaskState, to: TaskState },
    #[error("Cannot transition from terminal state {state}")]
    FromTerminalState { state: TaskState },
}

pub struct StateTransition;

impl StateTransition {
    /// wait -> running -> {success | fail}; nothing else.
    pub fn validate(from: TaskState, to: TaskState) -> Result<(), TransitionError> {
        if Self::is_terminal(from) {
            return Err(TransitionError::FromTerminalState { state: from });
        }

        let is_valid = matches!(
            (from, to),
            (TaskState::Wait, TaskState::Running)
                | (TaskState::Running, TaskState::Success)
                | (TaskState::Running, TaskState::Fail)
        );

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    pub fn is_terminal(state: TaskState) -> bool {
        matches!(state, TaskState::Success | TaskState::Fail)
    }
}
