use std::fmt::Write as _;

use taskweave_core::api::{resolve, CliError, PlanningResult};

use super::cli::{InputArgs, OutputFormat};
use super::{read_input, Session};

pub async fn plan_cmd(
    args: &InputArgs,
    format: OutputFormat,
    session: &Session,
) -> Result<i32, CliError> {
    let message = read_input(args)?;
    let planner = session.planner();
    let ctx = session.context();

    let plan = planner.plan(&message, &ctx).await?;
    match format {
        OutputFormat::Json => {
            let out = serde_json::to_string_pretty(&plan).map_err(anyhow::Error::from)?;
            println!("{out}");
        }
        OutputFormat::Text => print!("{}", render_plan(&plan)),
    }
    Ok(0)
}

/// Human-readable plan, grouped by wave.
pub fn render_plan(plan: &PlanningResult) -> String {
    let mut out = String::new();
    if !plan.summary.is_empty() {
        let _ = writeln!(out, "{}", plan.summary);
    }
    if plan.fallback {
        let _ = writeln!(out, "(fallback plan)");
    }

    let resolution = resolve(&plan.tasks);
    for (n, wave) in resolution.waves.iter().enumerate() {
        let _ = writeln!(out, "Wave {}:", n + 1);
        for &i in wave {
            let task = &plan.tasks[i];
            let _ = write!(out, "  - [{}] {} ({})", task.kind(), task.name, task.id);
            if task.has_predecessor() {
                let _ = write!(out, " after {}", task.predecessor);
            }
            out.push('\n');
        }
    }
    if !resolution.unresolved.is_empty() {
        let _ = writeln!(out, "Unresolved:");
        for &i in &resolution.unresolved {
            let task = &plan.tasks[i];
            let _ = writeln!(out, "  - {} ({}) after {}", task.name, task.id, task.predecessor);
        }
    }
    out
}
