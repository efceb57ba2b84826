//! Plain data for planning and execution: tasks, plans, and the per-request context.

mod context;
mod plan;
mod task;
mod transitions;

pub use context::{ExecutionContext, LlmParams, Message, OracleResponse, TokenUsage};
pub use plan::{build_dependency_map, first_duplicate_id, PlanningResult, TaskGraph};
pub use task::{Task, TaskKind, TaskState};
pub use transitions::{StateTransition, TransitionError};
