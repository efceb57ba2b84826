//! Task execution over dependency waves
//!
//! ```text
//! Vec<Task>
//!   ↓
//! resolve() → Resolution { waves, unresolved }
//!   ↓
//! TaskExecutor::execute_batch() → per wave: serial or bounded-parallel
//!   ↓
//! TaskExecutor::execute_task() → plain | function_call | delegate_call | delegate_spawn
//!   ↓
//! BatchReport
//! ```
//!
//! A delegate-spawn task may plan and execute a nested batch one level deeper;
//! the depth budget in `agent.max_steps` bounds the recursion.

mod call_parser;
mod engine;
mod graph;
mod handlers;
mod scheduler;
pub mod types;

pub use call_parser::{parse_delegate_call, parse_function_call, FunctionCall, DEFAULT_PERSONA};
pub use engine::{can_parallelize, TaskExecutor};
pub use graph::{group, resolve, Resolution};
pub use types::{BatchReport, TaskFailure};
