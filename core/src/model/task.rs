use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::transitions::{StateTransition, TransitionError};

/// Execution type of a task. Closed set; dispatch matches on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Direct execution through one oracle call.
    Plain,
    /// Invoke a named capability with parsed keyword arguments.
    FunctionCall,
    /// Ask a named peer persona, no further decomposition.
    DelegateCall,
    /// Run under an extended delegation chain (may decompose again).
    DelegateSpawn,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Plain => "task",
            TaskKind::FunctionCall => "function",
            TaskKind::DelegateCall => "agent_call",
            TaskKind::DelegateSpawn => "agent_gen",
        }
    }

    /// Parse a wire tag. Empty or unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "task" => Some(TaskKind::Plain),
            "function" => Some(TaskKind::FunctionCall),
            "agent_call" => Some(TaskKind::DelegateCall),
            "agent_gen" => Some(TaskKind::DelegateSpawn),
            _ => None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    #[default]
    Wait,
    Running,
    Success,
    Fail,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Wait => "wait",
            TaskState::Running => "running",
            TaskState::Success => "success",
            TaskState::Fail => "fail",
        }
    }

    pub fn is_terminal(&self) -> bool {
        StateTransition::is_terminal(*self)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Empty or unknown states read as `wait`.
impl<'de> Deserialize<'de> for TaskState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "running" => TaskState::Running,
            "success" => TaskState::Success,
            "fail" => TaskState::Fail,
            _ => TaskState::Wait,
        })
    }
}

mod kind_tag {
    use super::*;

    pub fn serialize<S: Serializer>(kind: &Option<TaskKind>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(kind.map(|k| k.as_str()).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TaskKind>, D::Error> {
        let raw = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(TaskKind::from_tag(&raw))
    }
}

/// One unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "sub_task_id", default)]
    pub id: String,

    #[serde(rename = "sub_task_name", default)]
    pub name: String,

    #[serde(rename = "sub_task_describe", default)]
    pub description: String,

    /// Free-text execution instructions; may carry call markers.
    #[serde(default)]
    pub process: String,

    /// `None` until set by the proposal or inferred by the optimizer.
    #[serde(rename = "sub_task_type", default, with = "kind_tag")]
    pub kind: Option<TaskKind>,

    /// Id of the single task that must finish first. Empty means none.
    #[serde(rename = "dependent", default)]
    pub predecessor: String,

    #[serde(rename = "output_md_file", default)]
    pub output_location: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default)]
    pub state: TaskState,

    #[serde(default)]
    pub state_msg: String,

    #[serde(default)]
    pub record_id: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Default for Task {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            process: String::new(),
            kind: None,
            predecessor: String::new(),
            output_location: String::new(),
            output: None,
            state: TaskState::Wait,
            state_msg: String::new(),
            record_id: String::new(),
            created_at: now,
            updated_at: now,
            metadata: Map::new(),
        }
    }
}

impl Task {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_process(mut self, process: impl Into<String>) -> Self {
        self.process = process.into();
        self
    }

    pub fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_predecessor(mut self, predecessor: impl Into<String>) -> Self {
        self.predecessor = predecessor.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Effective kind; an unset kind executes as a plain task.
    pub fn kind(&self) -> TaskKind {
        self.kind.unwrap_or(TaskKind::Plain)
    }

    pub fn has_predecessor(&self) -> bool {
        !self.predecessor.trim().is_empty()
    }

    pub fn transition(&mut self, to: TaskState) -> Result<(), TransitionError> {
        StateTransition::validate(self.state, to)?;
        self.state = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Move a running task to `fail` and attach the message.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(TaskState::Fail)?;
        self.state_msg = message.into();
        Ok(())
    }
}
