use serde::Serialize;

use crate::error::ExecutorError;

/// A task that ended in `fail`, with its state message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    pub task_id: String,
    pub message: String,
}

/// Result of executing a task list
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Execution waves, as task ids, in dispatch order
    pub waves: Vec<Vec<String>>,

    pub succeeded: Vec<String>,

    pub failures: Vec<TaskFailure>,

    /// Never dispatched because the context was cancelled (still `wait`)
    pub skipped: Vec<String>,

    /// Left out by the resolver: cyclic or blocked behind a cycle (still `wait`)
    pub unresolved: Vec<String>,

    /// Total execution duration in milliseconds
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failures.len() + self.skipped.len() + self.unresolved.len()
    }

    /// Every task ran and succeeded.
    pub fn is_success(&self) -> bool {
        self.succeeded.len() == self.total()
    }

    pub fn not_succeeded(&self) -> usize {
        self.total() - self.succeeded.len()
    }

    /// Collapse any failed, skipped or unresolved task into one error.
    pub fn ensure_success(&self) -> Result<(), ExecutorError> {
        if self.is_success() {
            return Ok(());
        }
        let first = self
            .failures
            .first()
            .map(|f| format!("{}: {}", f.task_id, f.message))
            .or_else(|| self.skipped.first().map(|id| format!("{id}: skipped")))
            .or_else(|| self.unresolved.first().map(|id| format!("{id}: unresolved")))
            .unwrap_or_default();
        Err(ExecutorError::BatchFailed {
            failed: self.not_succeeded(),
            total: self.total(),
            first,
        })
    }
}
