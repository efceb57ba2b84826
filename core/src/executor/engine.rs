use std::borrow::Borrow;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use crate::capability::CapabilityRegistry;
use crate::config::AgentConfig;
use crate::error::ExecutorError;
use crate::ledger::{append_best_effort, ExecutionLedger, LedgerKind};
use crate::model::{first_duplicate_id, ExecutionContext, Task, TaskKind, TaskState};
use crate::oracle::ReasoningOracle;
use crate::planner::Planner;

use super::graph::resolve;
use super::handlers::TaskOutcome;
use super::scheduler::{execute_wave_parallel, execute_wave_serial, Dispatch};
use super::types::{BatchReport, TaskFailure};

/// Dispatches tasks by kind and drives batches wave by wave.
pub struct TaskExecutor {
    pub(crate) oracle: Arc<dyn ReasoningOracle>,
    pub(crate) capabilities: Arc<CapabilityRegistry>,
    pub(crate) ledger: Arc<dyn ExecutionLedger>,
    pub(crate) planner: Option<Arc<Planner>>,
    parallel: bool,
    max_workers: usize,
}

impl TaskExecutor {
    pub fn new(
        oracle: Arc<dyn ReasoningOracle>,
        capabilities: Arc<CapabilityRegistry>,
        ledger: Arc<dyn ExecutionLedger>,
    ) -> Self {
        Self::from_config(oracle, capabilities, ledger, &AgentConfig::default())
    }

    pub fn from_config(
        oracle: Arc<dyn ReasoningOracle>,
        capabilities: Arc<CapabilityRegistry>,
        ledger: Arc<dyn ExecutionLedger>,
        cfg: &AgentConfig,
    ) -> Self {
        Self {
            oracle,
            capabilities,
            ledger,
            planner: None,
            parallel: cfg.parallel,
            max_workers: cfg.max_workers.max(1),
        }
    }

    /// Enables nested decomposition of delegate-spawn tasks.
    pub fn with_planner(mut self, planner: Arc<Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run one task: `wait -> running -> {success | fail}`.
    ///
    /// A task not in `wait` is rejected untouched. Otherwise the task always
    /// ends terminal and the returned error mirrors its `state_msg`.
    pub async fn execute_task(
        &self,
        task: &mut Task,
        ctx: &ExecutionContext,
    ) -> Result<(), ExecutorError> {
        task.transition(TaskState::Running)?;

        let record_id = append_best_effort(
            self.ledger.as_ref(),
            LedgerKind::SubtaskExecution,
            json!({
                "parent_id": ctx.parent_record_id,
                "agent_chain": ctx.agent_chain,
                "task_id": task.id,
                "task_name": task.name,
                "task_type": task.kind().as_str(),
                "status": "started",
            }),
            &ctx.parent_record_id,
        )
        .await;
        task.record_id = record_id.clone();

        tracing::info!(
            target: "taskweave.exec",
            stage = "task.start",
            task_id = %task.id,
            kind = %task.kind(),
            depth = ctx.depth,
        );

        let started = Instant::now();
        let result = self.dispatch(task, ctx).await;

        let result = match result {
            Ok(outcome) => {
                task.output = Some(outcome.output);
                task.output_location = outcome.location;
                task.transition(TaskState::Success)?;
                Ok(())
            }
            Err(e) => {
                task.fail(e.to_string())?;
                append_best_effort(
                    self.ledger.as_ref(),
                    LedgerKind::Error,
                    json!({
                        "parent_id": record_id,
                        "agent_chain": ctx.agent_chain,
                        "task_id": task.id,
                        "error": task.state_msg,
                    }),
                    &record_id,
                )
                .await;
                Err(e)
            }
        };

        append_best_effort(
            self.ledger.as_ref(),
            LedgerKind::SubtaskExecution,
            json!({
                "parent_id": record_id,
                "agent_chain": ctx.agent_chain,
                "task_id": task.id,
                "status": task.state.as_str(),
                "state_msg": task.state_msg,
                "output_md_file": task.output_location,
            }),
            &record_id,
        )
        .await;

        tracing::info!(
            target: "taskweave.exec",
            stage = "task.end",
            task_id = %task.id,
            state = %task.state,
            duration_ms = started.elapsed().as_millis() as u64,
        );
        result
    }

    async fn dispatch(
        &self,
        task: &Task,
        ctx: &ExecutionContext,
    ) -> Result<TaskOutcome, ExecutorError> {
        match task.kind() {
            TaskKind::FunctionCall => self.run_function(task, ctx).await,
            TaskKind::DelegateCall => self.run_delegate_call(task, ctx).await,
            TaskKind::DelegateSpawn => self.run_delegate_spawn(task, ctx).await,
            TaskKind::Plain => self.run_plain(task, ctx).await,
        }
    }

    /// Resolve waves and run them in order.
    ///
    /// Task failures never abort the batch; they are collected in the report,
    /// as are unresolved and skipped tasks (left in `wait`). Only duplicate
    /// ids are an error.
    pub async fn execute_batch(
        &self,
        tasks: &mut [Task],
        ctx: &ExecutionContext,
    ) -> Result<BatchReport, ExecutorError> {
        let start = Instant::now();
        let mut report = BatchReport::default();
        if tasks.is_empty() {
            return Ok(report);
        }
        if let Some(dup) = first_duplicate_id(tasks.iter().map(|t| t.id.as_str())) {
            return Err(ExecutorError::DuplicateTaskId(dup.to_string()));
        }

        let resolution = resolve(tasks);
        report.waves = resolution
            .waves
            .iter()
            .map(|wave| wave.iter().map(|&i| tasks[i].id.clone()).collect())
            .collect();
        report.unresolved = resolution
            .unresolved
            .iter()
            .map(|&i| tasks[i].id.clone())
            .collect();
        if !report.unresolved.is_empty() {
            tracing::warn!(
                target: "taskweave.exec",
                unresolved = ?report.unresolved,
                "cyclic or blocked tasks left undispatched"
            );
        }

        let total_waves = resolution.waves.len();
        for (wave_no, wave) in resolution.waves.iter().enumerate() {
            let members: HashSet<usize> = wave.iter().copied().collect();
            let wave_tasks: Vec<&mut Task> = tasks
                .iter_mut()
                .enumerate()
                .filter(|(i, _)| members.contains(i))
                .map(|(_, t)| t)
                .collect();

            let parallel = self.parallel && can_parallelize(&wave_tasks);
            tracing::debug!(
                target: "taskweave.exec",
                stage = "wave.start",
                wave = wave_no + 1,
                total_waves,
                size = wave_tasks.len(),
                parallel,
            );

            let outcomes = if parallel {
                execute_wave_parallel(self, wave_tasks, ctx, self.max_workers).await
            } else {
                execute_wave_serial(self, wave_tasks, ctx).await
            };

            for (task_id, outcome) in outcomes {
                match outcome {
                    Dispatch::Skipped => report.skipped.push(task_id),
                    Dispatch::Done(Ok(())) => report.succeeded.push(task_id),
                    Dispatch::Done(Err(e)) => {
                        tracing::warn!(target: "taskweave.exec", task_id = %task_id, error = %e, "task failed");
                        report.failures.push(TaskFailure {
                            task_id,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            target: "taskweave.exec",
            stage = "batch.end",
            succeeded = report.succeeded.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            unresolved = report.unresolved.len(),
            duration_ms = report.duration_ms,
        );
        Ok(report)
    }

    pub fn can_parallelize<T: Borrow<Task>>(&self, tasks: &[T]) -> bool {
        can_parallelize(tasks)
    }
}

/// False when a task's predecessor is in the same group or any task is a
/// delegate-spawn (it extends the delegation chain).
pub fn can_parallelize<T: Borrow<Task>>(tasks: &[T]) -> bool {
    let tasks: Vec<&Task> = tasks.iter().map(|t| <T as Borrow<Task>>::borrow(t)).collect();
    let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();

    let intra_dependency = tasks
        .iter()
        .any(|t| t.has_predecessor() && ids.contains(t.predecessor.trim()));
    let has_spawn = tasks.iter().any(|t| t.kind() == TaskKind::DelegateSpawn);

    !intra_dependency && !has_spawn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_eligibility() {
        let a = Task::new("a", "a").with_id("a");
        let b = Task::new("b", "b").with_id("b");
        let b_after_a = Task::new("b", "b").with_id("b").with_predecessor("a");
        let spawn = Task::new("s", "s")
            .with_id("s")
            .with_kind(TaskKind::DelegateSpawn);

        assert!(can_parallelize(&[a.clone(), b.clone()]));
        assert!(!can_parallelize(&[a.clone(), b_after_a]));
        assert!(!can_parallelize(&[a.clone(), spawn]));
        assert!(can_parallelize(&[b.with_predecessor("elsewhere")]));
        assert!(can_parallelize::<Task>(&[]));
    }
}
