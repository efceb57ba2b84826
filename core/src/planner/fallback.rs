use crate::model::{PlanningResult, Task, TaskKind};

use super::parse::generated_id;

const RESEARCH_HINTS: &[&str] = &["研究", "分析", "research", "analy", "investigat"];
const GENERATION_HINTS: &[&str] = &["生成", "创建", "generat", "create", "write", "draft"];

/// Deterministic plan built from keyword matching, used when the oracle's
/// proposal is unusable. Never empty.
pub fn fallback_plan(message: &str) -> PlanningResult {
    let lowered = message.to_lowercase();
    let steps: Vec<(&str, String, TaskKind)> = if RESEARCH_HINTS.iter().any(|k| lowered.contains(k))
    {
        vec![
            (
                "Information gathering",
                format!("Collect relevant information and data for: {message}"),
                TaskKind::DelegateCall,
            ),
            (
                "Deep analysis",
                format!("Analyze and organize the collected information for: {message}"),
                TaskKind::Plain,
            ),
            (
                "Report generation",
                format!("Write a detailed report from the analysis of: {message}"),
                TaskKind::DelegateSpawn,
            ),
        ]
    } else if GENERATION_HINTS.iter().any(|k| lowered.contains(k)) {
        vec![
            (
                "Requirements analysis",
                format!("Work out the requirements and constraints of: {message}"),
                TaskKind::Plain,
            ),
            (
                "Content generation",
                format!("Produce the content requested by: {message}"),
                TaskKind::DelegateSpawn,
            ),
            (
                "Quality review",
                format!("Review and polish the generated content for: {message}"),
                TaskKind::Plain,
            ),
        ]
    } else {
        vec![(
            "Task execution",
            format!("Execute task: {message}"),
            TaskKind::Plain,
        )]
    };

    let mut tasks: Vec<Task> = Vec::with_capacity(steps.len());
    for (i, (name, description, kind)) in steps.into_iter().enumerate() {
        let predecessor = tasks.last().map(|t| t.id.clone()).unwrap_or_default();
        tasks.push(
            Task::new(name, description)
                .with_id(generated_id(i))
                .with_kind(kind)
                .with_predecessor(predecessor),
        );
    }

    let summary = format!("Fallback plan with {} task(s) for '{}'", tasks.len(), message);
    let mut plan = PlanningResult::new(tasks, summary);
    plan.fallback = true;
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(plan: &PlanningResult) -> Vec<TaskKind> {
        plan.tasks.iter().map(|t| t.kind()).collect()
    }

    #[test]
    fn research_request_gets_three_chained_steps() {
        let plan = fallback_plan("Research the EV battery market");
        assert!(plan.fallback);
        assert_eq!(
            kinds(&plan),
            vec![TaskKind::DelegateCall, TaskKind::Plain, TaskKind::DelegateSpawn]
        );
        assert_eq!(plan.tasks[0].predecessor, "");
        assert_eq!(plan.tasks[1].predecessor, plan.tasks[0].id);
        assert_eq!(plan.tasks[2].predecessor, plan.tasks[1].id);
        assert!(plan.summary.contains("3 task(s)"));
    }

    #[test]
    fn chinese_generation_request() {
        let plan = fallback_plan("生成一份产品介绍");
        assert_eq!(
            kinds(&plan),
            vec![TaskKind::Plain, TaskKind::DelegateSpawn, TaskKind::Plain]
        );
    }

    #[test]
    fn anything_else_is_a_single_task() {
        let plan = fallback_plan("Book a meeting room");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.tasks[0].description, "Execute task: Book a meeting room");
        assert!(plan.dependencies[&plan.tasks[0].id].is_empty());
    }
}
