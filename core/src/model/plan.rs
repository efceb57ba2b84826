use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::task::Task;

/// Output of one planning attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanningResult {
    pub tasks: Vec<Task>,

    /// task id -> predecessor ids, derived from each task's `predecessor`.
    #[serde(default)]
    pub dependencies: HashMap<String, Vec<String>>,

    #[serde(default)]
    pub summary: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,

    /// Built from keyword matching because the oracle's answer was unusable.
    #[serde(default)]
    pub fallback: bool,
}

pub type TaskGraph = PlanningResult;

impl PlanningResult {
    pub fn new(tasks: Vec<Task>, summary: impl Into<String>) -> Self {
        let mut plan = Self {
            tasks,
            summary: summary.into(),
            ..Self::default()
        };
        plan.rebuild_dependencies();
        plan
    }

    pub fn rebuild_dependencies(&mut self) {
        self.dependencies = build_dependency_map(&self.tasks);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// Adjacency map from the single-predecessor field; roots map to an empty list.
pub fn build_dependency_map(tasks: &[Task]) -> HashMap<String, Vec<String>> {
    tasks
        .iter()
        .map(|t| {
            let deps = if t.has_predecessor() {
                vec![t.predecessor.clone()]
            } else {
                Vec::new()
            };
            (t.id.clone(), deps)
        })
        .collect()
}

/// First id that occurs more than once, if any.
pub fn first_duplicate_id<'a, I>(ids: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}
