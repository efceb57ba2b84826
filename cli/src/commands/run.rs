use std::sync::Arc;

use serde::Serialize;
use taskweave_core::api::{
    optimize_plan, AppConfig, BatchReport, CliError, Task, TaskExecutor, TaskState,
};

use super::cli::{OutputFormat, RunArgs};
use super::{read_input, Session};

#[derive(Serialize)]
struct RunSummary<'a> {
    report: &'a BatchReport,
    tasks: &'a [Task],
}

pub fn apply_run_overrides(cfg: &mut AppConfig, args: &RunArgs) {
    if args.parallel {
        cfg.agent.parallel = true;
    }
    if let Some(n) = args.max_workers {
        cfg.agent.max_workers = n.max(1);
    }
}

pub async fn run_cmd(
    args: &RunArgs,
    format: OutputFormat,
    session: &Session,
) -> Result<i32, CliError> {
    let message = read_input(&args.input)?;
    let planner = Arc::new(session.planner());
    let ctx = session.context();

    let mut tasks = if !args.no_plan && planner.needs_plan(&message) {
        planner.plan(&message, &ctx).await?.tasks
    } else {
        tracing::info!(target: "taskweave.exec", "executing request as a single task");
        optimize_plan(vec![
            Task::new("Execute request", message.clone()).with_process(message.clone())
        ])
    };

    let executor = TaskExecutor::from_config(
        session.oracle.clone(),
        session.registry.clone(),
        session.ledger.clone(),
        &session.cfg.agent,
    )
    .with_planner(planner);
    let report = executor.execute_batch(&mut tasks, &ctx).await?;

    match format {
        OutputFormat::Json => {
            let summary = RunSummary {
                report: &report,
                tasks: &tasks,
            };
            let out = serde_json::to_string_pretty(&summary).map_err(anyhow::Error::from)?;
            println!("{out}");
        }
        OutputFormat::Text => print!("{}", render_run(&tasks, &report)),
    }

    Ok(if report.is_success() { 0 } else { 40 })
}

pub fn render_run(tasks: &[Task], report: &BatchReport) -> String {
    let mut out = String::new();
    for task in tasks {
        out.push_str(&format!("[{}] {}\n", task.state, task.name));
        match task.state {
            TaskState::Success => {
                for line in task.output.as_deref().unwrap_or_default().lines() {
                    out.push_str(&format!("    {line}\n"));
                }
            }
            TaskState::Fail => out.push_str(&format!("    error: {}\n", task.state_msg)),
            _ => {}
        }
    }
    out.push_str(&format!(
        "{} succeeded, {} failed, {} skipped, {} unresolved in {}ms\n",
        report.succeeded.len(),
        report.failures.len(),
        report.skipped.len(),
        report.unresolved.len(),
        report.duration_ms
    ));
    out
}
