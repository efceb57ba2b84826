use chrono::Utc;

use crate::model::{Task, TaskKind};

/// Clean a raw proposal: drop empty and duplicate descriptions (first wins),
/// fill missing ids and kinds, restamp timestamps. Total and order-preserving.
pub fn optimize_plan(tasks: Vec<Task>) -> Vec<Task> {
    let mut optimized: Vec<Task> = Vec::with_capacity(tasks.len());

    for mut task in tasks {
        if task.description.trim().is_empty() {
            continue;
        }
        if optimized.iter().any(|t| t.description == task.description) {
            continue;
        }

        if task.id.trim().is_empty() {
            task.id = uuid::Uuid::new_v4().to_string();
        }
        if task.kind.is_none() {
            task.kind = Some(infer_kind(&task.process));
        }
        let now = Utc::now();
        task.created_at = now;
        task.updated_at = now;

        optimized.push(task);
    }

    optimized
}

/// Infer the execution type from markers in the process text.
pub fn infer_kind(process: &str) -> TaskKind {
    let process = process.to_lowercase();

    if process.contains("<function_call>") || process.contains("function:") {
        TaskKind::FunctionCall
    } else if process.contains("<agent_call>") || process.contains("agent:") {
        TaskKind::DelegateCall
    } else if process.contains("<agent_gen>") {
        TaskKind::DelegateSpawn
    } else {
        TaskKind::Plain
    }
}
