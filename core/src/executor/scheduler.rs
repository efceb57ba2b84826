use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::Semaphore;

use crate::error::ExecutorError;
use crate::model::{ExecutionContext, Task};

use super::engine::TaskExecutor;

/// How one task of a wave ended.
pub(crate) enum Dispatch {
    /// Cancellation arrived before the task got a worker.
    Skipped,
    Done(Result<(), ExecutorError>),
}

/// Execute a single wave of tasks in parallel
///
/// At most `max_concurrency` tasks run at once. All tasks share `ctx`
/// read-only. Returns once every task has finished or been skipped.
pub(crate) async fn execute_wave_parallel(
    executor: &TaskExecutor,
    wave: Vec<&mut Task>,
    ctx: &ExecutionContext,
    max_concurrency: usize,
) -> Vec<(String, Dispatch)> {
    let sem = Semaphore::new(max_concurrency.max(1));
    let mut futs: FuturesUnordered<_> = FuturesUnordered::new();

    for task in wave {
        let sem = &sem;
        futs.push(async move {
            let task_id = task.id.clone();
            let Ok(_permit) = sem.acquire().await else {
                return (task_id, Dispatch::Skipped);
            };
            if ctx.is_cancelled() {
                return (task_id, Dispatch::Skipped);
            }
            let res = executor.execute_task(task, ctx).await;
            (task_id, Dispatch::Done(res))
        });
    }

    let mut results = Vec::new();
    while let Some(res) = futs.next().await {
        results.push(res);
    }
    results
}

/// Execute a single wave in input order, one task at a time.
pub(crate) async fn execute_wave_serial(
    executor: &TaskExecutor,
    wave: Vec<&mut Task>,
    ctx: &ExecutionContext,
) -> Vec<(String, Dispatch)> {
    let mut results = Vec::with_capacity(wave.len());
    for task in wave {
        let task_id = task.id.clone();
        if ctx.is_cancelled() {
            results.push((task_id, Dispatch::Skipped));
            continue;
        }
        let res = executor.execute_task(task, ctx).await;
        results.push((task_id, Dispatch::Done(res)));
    }
    results
}
