use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{PlanningResult, Task, TaskKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProposalError {
    #[error("no JSON found in response")]
    NoJson,
    #[error("failed to parse JSON: {0}")]
    Decode(String),
}

// Accepts both the `sub_task_*` schema and the richer `id/name/type/dependencies` one.
#[derive(Debug, Default, Deserialize)]
struct RawPlan {
    #[serde(default)]
    tasks: Vec<RawTask>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    plan_metadata: Option<Value>,
    #[serde(default)]
    execution_flow: Option<Value>,
    #[serde(default)]
    risk_assessment: Option<Value>,
    #[serde(default)]
    success_criteria: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTask {
    #[serde(default, alias = "sub_task_id")]
    id: Option<Value>,
    #[serde(default, alias = "sub_task_name")]
    name: Option<String>,
    #[serde(default, alias = "sub_task_describe")]
    description: Option<String>,
    #[serde(default)]
    process: Option<String>,
    #[serde(default, rename = "type", alias = "sub_task_type")]
    kind: Option<String>,
    #[serde(default)]
    dependent: Option<Value>,
    #[serde(default)]
    dependencies: Vec<Value>,
    #[serde(default)]
    execution_strategy: Option<Value>,
    #[serde(default)]
    required_capabilities: Option<Value>,
    #[serde(default)]
    expected_output: Option<Value>,
    #[serde(default)]
    validation_criteria: Option<Value>,
    #[serde(default)]
    failure_handling: Option<Value>,
}

const PLACEHOLDER_IDS: &[&str] = &["task_xxx", "task_uuid"];

/// Decode the JSON span between the first `{` and the last `}` of an oracle reply.
///
/// Ids are kept when usable and generated otherwise; predecessor references
/// are resolved against the decoded tasks. The result is not optimized.
pub fn parse_proposal(content: &str) -> Result<PlanningResult, ProposalError> {
    let start = content.find('{').ok_or(ProposalError::NoJson)?;
    let end = content.rfind('}').ok_or(ProposalError::NoJson)?;
    if end < start {
        return Err(ProposalError::NoJson);
    }

    let raw: RawPlan = serde_json::from_str(&content[start..=end])
        .map_err(|e| ProposalError::Decode(e.to_string()))?;

    let mut tasks: Vec<Task> = raw
        .tasks
        .into_iter()
        .enumerate()
        .map(|(i, t)| convert_task(i, t))
        .collect();
    resolve_predecessors(&mut tasks);

    let mut metadata = Map::new();
    for (key, value) in [
        ("plan_metadata", raw.plan_metadata),
        ("execution_flow", raw.execution_flow),
        ("risk", raw.risk_assessment),
        ("success", raw.success_criteria),
    ] {
        if let Some(v) = value.filter(|v| !v.is_null()) {
            metadata.insert(key.to_string(), v);
        }
    }

    let summary = raw
        .summary
        .filter(|s| !s.trim().is_empty())
        .or(raw.reasoning)
        .unwrap_or_default();

    let mut plan = PlanningResult::new(tasks, summary);
    plan.metadata = metadata;
    Ok(plan)
}

pub(crate) fn generated_id(index: usize) -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("task_{}_{}", index, &uuid[..8])
}

fn convert_task(index: usize, raw: RawTask) -> Task {
    let id = scalar_text(raw.id.as_ref())
        .filter(|id| !PLACEHOLDER_IDS.contains(&id.to_ascii_lowercase().as_str()))
        .unwrap_or_else(|| generated_id(index));

    let dependencies: Vec<String> = raw
        .dependencies
        .iter()
        .filter_map(|v| scalar_text(Some(v)))
        .collect();
    let predecessor = scalar_text(raw.dependent.as_ref())
        .or_else(|| dependencies.first().cloned())
        .unwrap_or_default();

    let mut process = raw.process.unwrap_or_default();
    if process.trim().is_empty() {
        if let Some(method) = raw
            .execution_strategy
            .as_ref()
            .and_then(|s| s.get("method"))
            .and_then(Value::as_str)
        {
            process = method.to_string();
        }
    }

    let mut task = Task::new(
        raw.name.unwrap_or_default(),
        raw.description.unwrap_or_default(),
    )
    .with_id(id)
    .with_process(process)
    .with_predecessor(predecessor);
    task.kind = raw.kind.as_deref().and_then(map_kind_tag);

    if !dependencies.is_empty() {
        task.metadata.insert(
            "dependencies".to_string(),
            Value::from(dependencies.clone()),
        );
    }
    for (key, value) in [
        ("execution_strategy", raw.execution_strategy),
        ("capabilities", raw.required_capabilities),
        ("expected_output", raw.expected_output),
        ("validation", raw.validation_criteria),
        ("failure_handling", raw.failure_handling),
    ] {
        if let Some(v) = value.filter(|v| !v.is_null()) {
            task.metadata.insert(key.to_string(), v);
        }
    }

    task
}

/// Wire tags first, then the rich schema's intent tags. Unknown yields `None`.
fn map_kind_tag(tag: &str) -> Option<TaskKind> {
    TaskKind::from_tag(tag).or_else(|| match tag.trim().to_ascii_lowercase().as_str() {
        "research" | "synthesis" => Some(TaskKind::DelegateCall),
        "generation" => Some(TaskKind::DelegateSpawn),
        "analysis" | "execution" => Some(TaskKind::Plain),
        _ => None,
    })
}

/// Rewrite predecessor references to task ids: exact id, then name
/// (case-insensitive), then positional `task_<i>` / `<i>`. Unknown stays as-is.
fn resolve_predecessors(tasks: &mut [Task]) {
    let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
    let names: Vec<String> = tasks.iter().map(|t| t.name.trim().to_lowercase()).collect();

    for task in tasks.iter_mut() {
        let reference = task.predecessor.trim().to_string();
        if reference.is_empty() || ids.contains(&reference) {
            task.predecessor = reference;
            continue;
        }

        let lowered = reference.to_lowercase();
        if let Some(pos) = names.iter().position(|n| !n.is_empty() && *n == lowered) {
            task.predecessor = ids[pos].clone();
            continue;
        }

        let index = lowered
            .strip_prefix("task_")
            .unwrap_or(&lowered)
            .parse::<usize>()
            .ok()
            .filter(|i| *i < ids.len());
        if let Some(i) = index {
            task.predecessor = ids[i].clone();
        } else {
            task.predecessor = reference;
        }
    }
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
